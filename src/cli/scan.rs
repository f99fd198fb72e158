//! One-shot arbitrage scan over the demo universe.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::json;
use tabled::{Table, Tabled};

use crate::application::MarketIntel;
use crate::cli::{demo, output, ScanArgs};
use crate::config::Config;
use crate::domain::arbitrage::ArbitrageOpportunity;
use crate::domain::id::{CategoryId, RouteId, TypeId};
use crate::error::Result;
use crate::feed::ReferenceData;

#[derive(Tabled)]
struct OpportunityRow {
    #[tabled(rename = "Item")]
    item: String,
    #[tabled(rename = "Route")]
    route: String,
    #[tabled(rename = "Buy")]
    buy: String,
    #[tabled(rename = "Sell")]
    sell: String,
    #[tabled(rename = "Margin")]
    margin: String,
    #[tabled(rename = "Risk")]
    risk: String,
    #[tabled(rename = "Jumps")]
    jumps: u32,
    #[tabled(rename = "ISK/day")]
    daily: String,
}

#[derive(Tabled)]
struct ItemRow {
    #[tabled(rename = "Item")]
    item: String,
    #[tabled(rename = "Buy")]
    buy: String,
    #[tabled(rename = "Sell")]
    sell: String,
    #[tabled(rename = "Margin")]
    margin: String,
    #[tabled(rename = "Volume/day")]
    volume: u64,
    #[tabled(rename = "ISK/day")]
    daily: String,
}

fn percent(margin: Decimal) -> String {
    format!("{}%", (margin * dec!(100)).round_dp(2))
}

fn isk(value: Decimal) -> String {
    format!("{} ISK", value.round_dp(2))
}

fn item_label(reference: &dyn ReferenceData, type_id: TypeId) -> String {
    reference
        .type_name(type_id)
        .unwrap_or_else(|| format!("Type {type_id}"))
}

/// Scan routes for arbitrage, or drill into one route with `--route`.
pub fn execute(config: &Config, args: &ScanArgs) -> Result<()> {
    let (intel, _feed) = demo::build(config);
    let reference = demo::reference_set(&config.feed);
    let min_margin = args.min_margin.unwrap_or(config.arbitrage.min_margin);

    if let Some(route) = args.route {
        let top = args.top.unwrap_or(config.arbitrage.top_items);
        return route_detail(&intel, reference.as_ref(), RouteId::new(route), top);
    }

    let summary = match args.category {
        Some(category) => intel.scan_category(CategoryId::new(category), min_margin)?,
        None => intel.scan_routes(min_margin),
    };

    let opportunities: Vec<ArbitrageOpportunity> = match args.max_risk {
        Some(max_risk) => summary
            .opportunities
            .iter()
            .filter(|o| o.risk <= max_risk)
            .cloned()
            .collect(),
        None => summary.opportunities.clone(),
    };

    if output::is_json() {
        output::json_output(&json!({
            "type": "scan",
            "payload": {
                "min_margin": min_margin,
                "routes_considered": summary.routes_considered,
                "routes_skipped": summary.routes_skipped,
                "opportunities": opportunities,
            },
        }));
        return Ok(());
    }

    output::header(env!("CARGO_PKG_VERSION"));
    output::section(&format!("arbitrage scan, margin floor {}", percent(min_margin)));
    output::field("routes", summary.routes_considered);
    if summary.routes_skipped > 0 {
        output::field("skipped", summary.routes_skipped);
    }
    output::field("found", opportunities.len());

    for message in &summary.skipped {
        output::warning(message);
    }

    if opportunities.is_empty() {
        output::note(&format!(
            "nothing clears the margin floor; try a lower {}",
            output::highlight("--min-margin")
        ));
        return Ok(());
    }

    let rows: Vec<OpportunityRow> = opportunities
        .iter()
        .map(|o| OpportunityRow {
            item: item_label(reference.as_ref(), o.type_id),
            route: format!("{} -> {}", o.buy_hub_name, o.sell_hub_name),
            buy: isk(o.buy_price),
            sell: isk(o.sell_price),
            margin: percent(o.margin),
            risk: o.risk.to_string(),
            jumps: o.jumps,
            daily: isk(o.daily_potential_profit()),
        })
        .collect();

    println!();
    output::table(&Table::new(rows).to_string());
    Ok(())
}

fn route_detail(
    intel: &MarketIntel,
    reference: &dyn ReferenceData,
    route: RouteId,
    top: usize,
) -> Result<()> {
    let items = intel.top_profitable_items(route, top)?;

    if output::is_json() {
        output::json_output(&json!({
            "type": "route-items",
            "payload": {
                "route": route,
                "items": items,
            },
        }));
        return Ok(());
    }

    output::header(env!("CARGO_PKG_VERSION"));
    output::section(&format!("top {top} items on route {route}"));

    if items.is_empty() {
        output::note("no recommended items on this route");
        return Ok(());
    }

    let rows: Vec<ItemRow> = items
        .iter()
        .map(|i| ItemRow {
            item: item_label(reference, i.type_id),
            buy: isk(i.buy_price),
            sell: isk(i.sell_price),
            margin: percent(i.margin),
            volume: i.daily_volume,
            daily: isk(i.daily_potential_profit()),
        })
        .collect();

    println!();
    output::table(&Table::new(rows).to_string());
    Ok(())
}
