//! Vendor command - Direct access to the GPU provider for operators.

use crate::cli::args::{VendorAction, VendorArgs};
use crate::config::Config;
use crate::domain::{InstanceBinding, InstanceStatus};
use crate::errors::{AppError, AppResult};
use crate::infra::vendor::{ActionReceipt, ListQuery};
use crate::infra::{GpuVendorClient, VendorApi, VendorError};

/// Execute the vendor command
pub async fn execute(args: VendorArgs, config: Config) -> AppResult<()> {
    let token = args
        .token
        .or_else(|| config.vendor_bearer_token().map(str::to_string))
        .ok_or(AppError::from(VendorError::MissingToken))?;
    let client = GpuVendorClient::from_config(&config)?;

    match args.action {
        VendorAction::List {
            page,
            page_size,
            status,
            nick_name,
        } => {
            let listing = client
                .list_instances(
                    &token,
                    ListQuery {
                        page_no: page,
                        page_size,
                        status,
                        nick_name,
                    },
                )
                .await?;
            println!("{} instance(s) in total", listing.total);
            for instance in listing.instances {
                println!(
                    "{:>8}  {:<24}  {:<20}  status={}",
                    instance.instance_id,
                    instance.instance_uuid,
                    instance.nickname.as_deref().unwrap_or("-"),
                    instance.status
                );
            }
        }
        VendorAction::Status { instance_id } => {
            let report = client
                .instance_status(&token, instance_id)
                .await?
                .ok_or_else(|| AppError::not_found("Instance at the GPU provider"))?;
            let label = match report.status {
                InstanceStatus::Running => "running".to_string(),
                InstanceStatus::Stopped => "stopped".to_string(),
                InstanceStatus::Unknown(code) => format!("unknown ({code})"),
            };
            println!("{instance_id}: {label}");
            if let Some(url) = report.jupyter_url {
                println!("jupyter: {url}");
            }
        }
        VendorAction::Start {
            instance_id,
            instance_uuid,
        } => {
            let binding = InstanceBinding {
                instance_id,
                instance_uuid,
            };
            print_receipt(&client.start_instance(&token, &binding).await?);
        }
        VendorAction::Stop {
            instance_id,
            instance_uuid,
        } => {
            let binding = InstanceBinding {
                instance_id,
                instance_uuid,
            };
            print_receipt(&client.stop_instance(&token, &binding).await?);
        }
    }

    Ok(())
}

fn print_receipt(receipt: &ActionReceipt) {
    if receipt.skipped {
        println!("{}: already in the requested state", receipt.action.as_str());
    } else {
        println!("{}: sent at {}", receipt.action.as_str(), receipt.at.to_rfc3339());
    }
}
