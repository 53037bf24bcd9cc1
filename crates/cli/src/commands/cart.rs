//! Cart display and mutation commands.
//!
//! # Usage
//!
//! ```bash
//! tl-cart show
//! tl-cart add 42 --name "Oak Bench" --price 249.00 --quantity 2 --variant 7
//! tl-cart inc 42
//! tl-cart set 42 0
//! tl-cart sync
//! ```

use std::io::{self, Write};

use rust_decimal::Decimal;

use timberline_core::{CartProduct, Price, ProductId, Quantity, SpecificationId};
use timberline_storefront::models::CartState;
use timberline_storefront::services::ReconcileOutcome;

use super::{CliError, Context};

/// Print the cart to stdout.
pub fn show(ctx: &Context) -> Result<(), CliError> {
    let state = ctx.cart.snapshot();
    render(&state, &mut io::stdout().lock())?;
    Ok(())
}

/// Add a product.
pub async fn add(
    ctx: &Context,
    id: ProductId,
    name: String,
    price: Decimal,
    quantity: u32,
    image: Option<String>,
    variant: Option<SpecificationId>,
) -> Result<(), CliError> {
    let unit_price = Price::new(price).map_err(|e| CliError::InvalidArgument(e.to_string()))?;
    let quantity =
        Quantity::new(quantity).map_err(|e| CliError::InvalidArgument(e.to_string()))?;

    let product = CartProduct {
        id,
        name,
        unit_price,
        image,
    };
    ctx.cart.add_item(product, quantity, variant).await?;
    Ok(())
}

/// Reconcile with the account cart.
pub async fn sync(ctx: &Context) -> Result<(), CliError> {
    match ctx.cart.reconcile().await? {
        ReconcileOutcome::Skipped => tracing::info!("Not logged in, nothing to sync"),
        outcome => tracing::info!(?outcome, "Cart synced"),
    }
    Ok(())
}

fn money(amount: Decimal) -> String {
    format!("${amount:.2}")
}

/// Write a human-readable cart summary.
fn render(state: &CartState, out: &mut impl Write) -> io::Result<()> {
    let mode = if state.is_authenticated {
        "account"
    } else {
        "guest"
    };

    if state.is_empty() {
        writeln!(out, "Cart is empty ({mode})")?;
        return Ok(());
    }

    for line in &state.items {
        write!(
            out,
            "{} x {}  [{}]  {} = {}",
            line.quantity,
            line.name,
            line.id,
            line.unit_price,
            money(line.line_total())
        )?;
        if let Some(variant) = &line.variant {
            write!(out, "  (variant {variant})")?;
        }
        writeln!(out)?;
    }

    writeln!(out, "Items: {}", state.total_item_count())?;
    writeln!(out, "Total: {}", money(state.total_price()))?;
    if let Some(coupon) = &state.coupon {
        writeln!(
            out,
            "Coupon {}: -{}  => {}",
            coupon.code,
            money(coupon.discount),
            money(state.discounted_total())
        )?;
    }
    writeln!(out, "Mode: {mode}")?;
    Ok(())
}
