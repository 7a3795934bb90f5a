//! Categories command - list a household's categories

use anyhow::Result;
use colored::Colorize;

use super::get_context;
use crate::output;

pub fn run(household: &str, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let usage = ctx.repository.get_category_usage(household)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&usage)?);
        return Ok(());
    }

    if usage.is_empty() {
        println!("No categories found.");
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["Name", "Type", "Scope", "Flags", "Transactions", "Total"]);

    for entry in &usage {
        let category = &entry.category;
        let scope = if category.household_id.is_some() {
            "household".to_string()
        } else {
            "shared".dimmed().to_string()
        };
        let flags = [
            category.is_fixed.then_some("fixed"),
            category.is_allowance.then_some("allowance"),
        ]
        .iter()
        .filter_map(|&f| f)
        .collect::<Vec<_>>()
        .join(", ");

        table.add_row(vec![
            category.name.clone(),
            category.category_type.as_str().to_string(),
            scope,
            flags,
            entry.transaction_count.to_string(),
            output::amount(entry.total_cents),
        ]);
    }

    println!("{}", table);

    let total = ctx.repository.count_transactions(household)?;
    let categorized: i64 = usage.iter().map(|u| u.transaction_count).sum();
    if total > categorized {
        println!();
        output::info(&format!("{} transaction(s) without a category", total - categorized));
    }

    Ok(())
}
