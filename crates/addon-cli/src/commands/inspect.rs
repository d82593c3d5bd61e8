//! Inspect command

use addon_core::{Loader, Request};
use addon_registry::PublishedModel;
use colored::Colorize;
use serde_json::{Value, json};

use crate::error::{CliError, Result};

/// Load the installed modules and show one composed model.
pub fn run_inspect(loader: &Loader, model: &str, json: bool) -> Result<()> {
    let report = loader.run(&Request::Load)?;
    for warning in &report.warnings {
        eprintln!("{} {}", "warning:".yellow().bold(), warning);
    }

    let registry = loader.registry();
    let Some(found) = registry.get(model) else {
        return Err(CliError::user(format!(
            "Model '{model}' is not defined by any installed module"
        )));
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&describe(found))?);
        return Ok(());
    }

    println!("{} {}", "Model".bold(), found.key.cyan().bold());
    println!();
    println!("{}:  {}", "Declared by".dimmed(), found.declared_by);
    if !found.extended_by.is_empty() {
        println!("{}:  {}", "Extended by".dimmed(), found.extended_by.join(", "));
    }
    if let Some(description) = &found.description {
        println!("{}:  {}", "Description".dimmed(), description);
    }
    println!();

    println!("{}:", "Fields".bold());
    for field in found.fields() {
        println!(
            "  {:<24} {:<12} {}",
            field.decl.name.green(),
            field.decl.kind.name(),
            field.module.dimmed()
        );
    }
    println!();

    println!("{}:", "Methods".bold());
    for chain in found.methods() {
        println!("  {:<24} {}", chain.name().green(), dispatch_order(chain.modules()).join(" > "));
    }

    Ok(())
}

/// Providing modules in call order, most recent first.
fn dispatch_order<'a>(modules: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let mut order: Vec<&str> = modules.collect();
    order.reverse();
    order
}

fn describe(model: &PublishedModel) -> Value {
    let fields: Vec<Value> = model
        .fields()
        .iter()
        .map(|field| {
            json!({
                "name": field.decl.name,
                "type": field.decl.kind.name(),
                "label": field.decl.display_label(),
                "required": field.decl.required,
                "module": field.module,
            })
        })
        .collect();
    let methods: serde_json::Map<String, Value> = model
        .methods()
        .map(|chain| (chain.name().to_string(), json!(dispatch_order(chain.modules()))))
        .collect();

    json!({
        "model": model.key,
        "kind": model.kind,
        "description": model.description,
        "declared_by": model.declared_by,
        "extended_by": model.extended_by,
        "fields": fields,
        "methods": methods,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_order_is_most_recent_first() {
        let layers = ["base", "sale", "sale_stock"];
        assert_eq!(dispatch_order(layers.into_iter()), vec!["sale_stock", "sale", "base"]);
    }
}
