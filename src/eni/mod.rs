/*
 * Copyright (c) 2024 Yunshan Networks
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

mod error;
mod http;

pub use error::{Error, Result};
pub use http::HttpMetadataClient;

use std::collections::HashMap;

use async_trait::async_trait;
use log::info;
use serde::Serialize;

/// Read only view of the instance metadata service.
#[async_trait]
pub trait MetadataClient: Send + Sync {
    /// Macs of all enis attached to this host.
    async fn eni_macs(&self) -> Result<Vec<String>>;
    /// Mac of the primary eni.
    async fn mac(&self) -> Result<String>;
    async fn eni_primary_ipv4(&self, mac: &str) -> Result<String>;
    async fn eni_ipv4_subnet_mask(&self, mac: &str, primary_ip: &str) -> Result<String>;
    async fn eni_ipv4_gateway(&self, mac: &str, primary_ip: &str) -> Result<String>;
    /// All ipv4 addresses bound to the eni, primary first.
    async fn eni_ipv4_list(&self, mac: &str) -> Result<Vec<String>>;
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct EniMeta {
    pub mac: String,
    pub primary: bool,
    pub primary_ip: String,
    pub mask: String,
    pub gateway: String,
    // every address of the eni, the primary ip included
    pub secondary_ips: Vec<String>,
}

/// Lowercase mac -> eni metadata
pub type EniMetaMap = HashMap<String, EniMeta>;

/// Builds the eni metadata of this host from scratch.
///
/// Macs are visited in the order the metadata service lists them. The first
/// failed lookup fails the whole call.
pub async fn get_eni_meta_map<M: MetadataClient + ?Sized>(meta_cli: &M) -> Result<EniMetaMap> {
    let mac_list = meta_cli.eni_macs().await?;
    let primary_mac = meta_cli.mac().await?.to_lowercase();

    let mut eni_meta_map = EniMetaMap::with_capacity(mac_list.len());
    for mac in mac_list {
        let imac = mac.to_lowercase();
        let primary_ip = meta_cli.eni_primary_ipv4(&mac).await?;
        let mask = meta_cli.eni_ipv4_subnet_mask(&mac, &primary_ip).await?;
        let gateway = meta_cli.eni_ipv4_gateway(&mac, &primary_ip).await?;
        let secondary_ips = meta_cli.eni_ipv4_list(&mac).await?;

        let eni_meta = EniMeta {
            primary: imac == primary_mac,
            mac: imac.clone(),
            primary_ip,
            mask,
            gateway,
            secondary_ips,
        };
        info!("get eni metadata: {:?}", eni_meta);
        eni_meta_map.insert(imac, eni_meta);
    }
    Ok(eni_meta_map)
}

pub fn primary_eni(eni_meta_map: &EniMetaMap) -> Option<&EniMeta> {
    eni_meta_map.values().find(|m| m.primary)
}
