use clap::{Args, Subcommand};
use storefront_checkout::{cart::CartMutation, config::StorefrontConfig, ids::VariantId};

use super::{open_session, print_session};

#[derive(Debug, Args)]
pub(crate) struct CartCommand {
    #[command(subcommand)]
    command: CartSubcommand,
}

#[derive(Debug, Subcommand)]
enum CartSubcommand {
    /// Show the cart and its totals
    Show,
    /// Add units of a variant
    Add {
        /// Variant identifier
        variant: String,
        /// Units to add
        #[arg(default_value_t = 1)]
        quantity: u32,
    },
    /// Set the quantity of a variant; 0 removes it
    Update {
        /// Variant identifier
        variant: String,
        /// New quantity
        quantity: u32,
    },
    /// Remove a variant from the cart
    Remove {
        /// Variant identifier
        variant: String,
    },
    /// Empty the cart
    Clear,
}

impl CartSubcommand {
    fn into_mutation(self) -> Option<CartMutation> {
        match self {
            Self::Show => None,
            Self::Add { variant, quantity } => Some(CartMutation::Add {
                variant_id: VariantId::new(variant),
                quantity,
            }),
            Self::Update { variant, quantity } => Some(CartMutation::Update {
                variant_id: VariantId::new(variant),
                quantity,
            }),
            Self::Remove { variant } => Some(CartMutation::Remove {
                variant_id: VariantId::new(variant),
            }),
            Self::Clear => Some(CartMutation::Clear),
        }
    }
}

pub(crate) async fn run(command: CartCommand, config: &StorefrontConfig) -> Result<(), String> {
    let mut session = open_session(config).await?;

    if let Some(mutation) = command.command.into_mutation() {
        session
            .mutate(mutation)
            .await
            .map_err(|error| error.to_string())?;
    }

    print_session(&session)
}
