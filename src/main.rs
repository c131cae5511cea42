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

use std::process;

use anyhow::{anyhow, Result};
use clap::{ArgAction, Args, CommandFactory, Parser, Subcommand};
use log::{error, info};
use tokio::runtime::Runtime;

use ::eni_ipam::{
    cloudprovider::{self, CloudProvider, GrpcCloudProvider},
    config::Config,
    eni::{self, HttpMetadataClient},
    utils::logger,
};
use public::{
    consts::{CLOUD_PROVIDER_UNREACHABLE_EXIT, DEFAULT_CONF_FILE},
    proto::cloudprovider::{AssignIpRequest, UnAssignIpRequest},
    utils::net::get_eni_index_with_prefix,
};

#[derive(Parser)]
struct Opts {
    /// Specify config file location
    #[clap(short = 'f', long, default_value = DEFAULT_CONF_FILE)]
    config_file: String,

    /// Display the version
    #[clap(short, long, action = ArgAction::SetTrue)]
    version: bool,

    #[clap(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Print the eni metadata of this host as json
    Discover,
    /// Bind a floating ip through the cloud provider
    Assign(IpArgs),
    /// Release a floating ip through the cloud provider
    Unassign(IpArgs),
    /// Print the eni index of a kernel interface, e.g. eth1
    Index { if_name: String },
}

#[derive(Args)]
struct IpArgs {
    #[clap(long)]
    node: String,
    #[clap(long)]
    ip: String,
    #[clap(long, default_value = "")]
    app: String,
    #[clap(long, default_value = "")]
    pod: String,
    #[clap(long, default_value = "default")]
    namespace: String,
}

async fn run(config: Config, command: Command) -> Result<()> {
    match command {
        Command::Discover => {
            let meta_cli =
                HttpMetadataClient::new(&config.metadata_endpoint, config.metadata_timeout);
            let eni_meta_map = eni::get_eni_meta_map(&meta_cli).await?;
            println!("{}", serde_json::to_string_pretty(&eni_meta_map)?);
        }
        Command::Assign(args) => {
            let provider = cloud_provider(&config);
            let reply = provider
                .assign_ip(AssignIpRequest {
                    node_name: args.node,
                    ip_address: args.ip,
                    app_name: args.app,
                    pod_name: args.pod,
                    pod_namespace: args.namespace,
                })
                .await?;
            println!("{:?}", reply);
        }
        Command::Unassign(args) => {
            let provider = cloud_provider(&config);
            let reply = provider
                .un_assign_ip(UnAssignIpRequest {
                    node_name: args.node,
                    ip_address: args.ip,
                    app_name: args.app,
                    pod_name: args.pod,
                    pod_namespace: args.namespace,
                })
                .await?;
            println!("{:?}", reply);
        }
        Command::Index { if_name } => {
            println!(
                "{}",
                get_eni_index_with_prefix(&if_name, &config.device_prefix)?
            );
        }
    }
    Ok(())
}

fn cloud_provider(config: &Config) -> GrpcCloudProvider {
    info!(
        "cloud provider {} resolved to {:?}",
        config.cloud_provider_addr,
        config.resolved_cloud_provider_addr()
    );
    GrpcCloudProvider::with_dialer(&config.cloud_provider_addr, config.grpc_dialer())
        .with_timeout(config.rpc_timeout)
}

fn main() -> Result<()> {
    let opts = Opts::parse();
    if opts.version {
        println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
        return Ok(());
    }
    let Some(command) = opts.command else {
        Opts::command().print_help()?;
        return Err(anyhow!("no command given"));
    };

    let config = Config::load_from_file(&opts.config_file)?;
    let _logger_handle = logger::init_logger(&config.log_file)?;
    info!("config {:#?}", config);

    let runtime = Runtime::new()?;
    if let Err(e) = runtime.block_on(run(config, command)) {
        if let Some(e) = e.downcast_ref::<cloudprovider::Error>() {
            if e.is_fatal() {
                error!("{:?}", e);
                process::exit(CLOUD_PROVIDER_UNREACHABLE_EXIT);
            }
        }
        error!("{:#}", e);
        return Err(e);
    }
    Ok(())
}
