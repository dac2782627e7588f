use clap::{Args, Subcommand};
use storefront_checkout::config::StorefrontConfig;

use super::{open_session, print_session, say};

#[derive(Debug, Args)]
pub(crate) struct CouponCommand {
    #[command(subcommand)]
    command: CouponSubcommand,
}

#[derive(Debug, Subcommand)]
enum CouponSubcommand {
    /// Validate a code and apply it to the cart
    Apply {
        /// Coupon code
        code: String,
    },
    /// Remove the applied coupon
    Remove,
}

pub(crate) async fn run(command: CouponCommand, config: &StorefrontConfig) -> Result<(), String> {
    let mut session = open_session(config).await?;

    match command.command {
        CouponSubcommand::Apply { code } => {
            session
                .apply_coupon(&code)
                .await
                .map_err(|error| error.to_string())?;
        }
        CouponSubcommand::Remove => {
            let removed = session.remove_coupon().map_err(|error| error.to_string())?;

            match removed {
                Some(applied) => say(format!("Coupon {} removed", applied.code()))?,
                None => say("No coupon was applied")?,
            }
        }
    }

    print_session(&session)
}
