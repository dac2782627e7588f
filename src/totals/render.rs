//! Tabular rendering of a totals breakdown.

use std::io;

use rusty_money::{Money, iso::Currency};
use tabled::{
    builder::Builder,
    grid::config::HorizontalLine,
    settings::{
        Alignment, Color, Style, Theme,
        object::{Columns, Rows},
    },
};

use crate::{
    cart::{CartLine, CartSnapshot},
    totals::{CartTotals, TotalsError},
};

pub(super) fn write_totals(
    mut out: impl io::Write,
    totals: &CartTotals<'_>,
    cart: &CartSnapshot<'_>,
) -> Result<(), TotalsError> {
    let mut builder = Builder::default();

    builder.push_record([
        "Item",
        "Qty",
        "Unit Price",
        "Final Price",
        "Line Total",
        "Offer Discount",
    ]);

    let mut inactive_rows = Vec::new();

    for line in cart.lines() {
        let discount = totals
            .line_discounts()
            .iter()
            .find(|discount| discount.variant_id() == line.variant_id())
            .map_or_else(|| "-".to_string(), |discount| negative(discount.amount()));

        if !line.is_active() {
            inactive_rows.push(builder.count_records());
        }

        builder.push_record([
            line_label(line),
            line.quantity().to_string(),
            line.unit_price().to_string(),
            line.final_unit_price().to_string(),
            line_total(line),
            discount,
        ]);
    }

    let mut table = builder.build();
    let mut theme = Theme::from(Style::modern_rounded());

    theme.remove_horizontal_lines();
    theme.insert_horizontal_line(
        1,
        HorizontalLine::new(Some('─'), Some('┼'), Some('├'), Some('┤')),
    );

    table.with(theme);
    table.modify(Rows::first(), Color::BOLD);
    table.modify(Columns::new(1..6), Alignment::right());

    for row in inactive_rows {
        table.modify(Rows::one(row), color_dark_grey());
    }

    writeln!(out, "\n{table}").map_err(TotalsError::IO)?;

    write_summary(&mut out, totals)
}

fn write_summary(out: &mut impl io::Write, totals: &CartTotals<'_>) -> Result<(), TotalsError> {
    let coupon_label = match totals.coupon_code() {
        Some(code) => format!("Coupon ({code}):"),
        None => "Coupon:".to_string(),
    };

    let lines = [
        ("Subtotal:".to_string(), totals.subtotal().to_string()),
        ("Offer discounts:".to_string(), negative(totals.item_discount())),
        (coupon_label, negative(totals.coupon_discount())),
        ("Delivery:".to_string(), totals.delivery_fee().to_string()),
        ("Total:".to_string(), totals.total().to_string()),
    ];

    let label_width = lines.iter().map(|(label, _)| label.chars().count()).max().unwrap_or(0);
    let value_width = lines.iter().map(|(_, value)| value.chars().count()).max().unwrap_or(0);

    for (label, value) in &lines {
        writeln!(out, " {label:>label_width$}  {value:>value_width$}").map_err(TotalsError::IO)?;
    }

    Ok(())
}

fn line_label(line: &CartLine<'_>) -> String {
    if line.is_active() {
        line.variant_id().to_string()
    } else {
        format!("{} (inactive)", line.variant_id())
    }
}

fn line_total(line: &CartLine<'_>) -> String {
    line.value_minor().map_or_else(
        |_err| "-".to_string(),
        |minor| Money::from_minor(minor, line.final_unit_price().currency()).to_string(),
    )
}

fn negative(amount: &Money<'_, Currency>) -> String {
    if amount.is_zero() {
        amount.to_string()
    } else {
        format!("-{amount}")
    }
}

/// ANSI dark grey foreground.
fn color_dark_grey() -> Color {
    Color::new("\x1b[90m", "\x1b[0m")
}
