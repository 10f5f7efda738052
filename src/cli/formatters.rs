//! Output formatting module for CLI display
//!
//! Keeps presentation separate from the tax engine: every function here
//! takes finished results and renders them as a table or as JSON.

use colored::Colorize;
use darf::models::{Category, OperationType, Transaction};
use darf::records::PositionLedger;
use darf::tax::{format_darf_payment, Classification, DarfAssessment, DarfPayment, TaxEngine};
use darf::utils::{format_currency, format_decimal_br};
use rust_decimal::Decimal;
use serde::Serialize;
use tabled::{
    settings::{object::Columns, Alignment, Modify, Style},
    Table, Tabled,
};

#[derive(Tabled)]
struct RegimeRow {
    #[tabled(rename = "Regime")]
    regime: String,
    #[tabled(rename = "Compras")]
    purchases: String,
    #[tabled(rename = "Vendas")]
    sales: String,
    #[tabled(rename = "Resultado")]
    profit: String,
    #[tabled(rename = "Prejuízo a compensar")]
    carried_loss: String,
    #[tabled(rename = "Imposto")]
    due_tax: String,
}

fn colorize_result(value: Decimal) -> String {
    let text = format_currency(value);
    if value > Decimal::ZERO {
        text.green().to_string()
    } else if value < Decimal::ZERO {
        text.red().to_string()
    } else {
        text
    }
}

/// Per-regime table followed by the DARF summary
pub fn format_run_table(
    engine: &TaxEngine,
    assessment: &DarfAssessment,
    payment: Option<&DarfPayment>,
) -> String {
    let rows: Vec<RegimeRow> = engine
        .totals()
        .iter()
        .map(|(category, totals)| RegimeRow {
            regime: category.label().to_string(),
            purchases: format_currency(totals.total_purchase),
            sales: format_currency(totals.total_sale),
            profit: colorize_result(totals.total_profit),
            carried_loss: format_currency(engine.accumulated_loss(category)),
            due_tax: format_currency(totals.due_tax),
        })
        .collect();

    let table = Table::new(rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..)).with(Alignment::right()))
        .to_string();

    let mut output = format!("{}\n\n", table);
    output.push_str(&format!(
        "Saldo DARF anterior: {}\n",
        format_currency(assessment.carried_in)
    ));
    output.push_str(&format!(
        "Valor do DARF:       {}\n",
        format_currency(assessment.darf_value)
    ));

    if assessment.is_deferred() {
        output.push_str(&format!(
            "{} DARF abaixo do mínimo; {} acumulado para o próximo período\n",
            "→".yellow(),
            format_currency(assessment.carried_out)
        ));
    } else if assessment.payable.is_zero() {
        output.push_str(&format!("{} Nenhum DARF a pagar\n", "✓".green()));
    } else {
        output.push_str(&format!(
            "{} A pagar: {}\n",
            "✓".green().bold(),
            format_currency(assessment.payable).bold()
        ));
        if let Some(payment) = payment {
            output.push('\n');
            output.push_str(&format_darf_payment(payment));
            output.push('\n');
        }
    }

    output
}

/// Run results as JSON; decimals are rendered as strings to keep precision
pub fn format_run_json(
    engine: &TaxEngine,
    assessment: &DarfAssessment,
    payment: Option<&DarfPayment>,
) -> String {
    #[derive(Serialize)]
    struct JsonRegime {
        regime: &'static str,
        total_purchase: String,
        total_sale: String,
        total_profit: String,
        due_tax: String,
        accumulated_loss: String,
    }

    #[derive(Serialize)]
    struct JsonRun<'a> {
        regimes: Vec<JsonRegime>,
        carried_in: String,
        darf_value: String,
        payable: String,
        carried_out: String,
        payment: Option<&'a DarfPayment>,
    }

    let regimes = engine
        .totals()
        .iter()
        .map(|(category, totals)| JsonRegime {
            regime: category.as_str(),
            total_purchase: totals.total_purchase.to_string(),
            total_sale: totals.total_sale.to_string(),
            total_profit: totals.total_profit.to_string(),
            due_tax: totals.due_tax.to_string(),
            accumulated_loss: engine.accumulated_loss(category).to_string(),
        })
        .collect();

    let run = JsonRun {
        regimes,
        carried_in: assessment.carried_in.to_string(),
        darf_value: assessment.darf_value.to_string(),
        payable: assessment.payable.to_string(),
        carried_out: assessment.carried_out.to_string(),
        payment,
    };

    serde_json::to_string_pretty(&run).unwrap_or_else(|_| "{}".to_string())
}

#[derive(Tabled)]
struct PositionRow {
    #[tabled(rename = "Ticker")]
    ticker: String,
    #[tabled(rename = "Categoria")]
    category: String,
    #[tabled(rename = "Quantidade")]
    quantity: String,
    #[tabled(rename = "Preço Médio")]
    average_cost: String,
    #[tabled(rename = "Custo Total")]
    total_cost: String,
    #[tabled(rename = "Taxas")]
    fees: String,
}

pub fn format_positions_table(ledger: &PositionLedger) -> String {
    if ledger.is_empty() {
        return "No positions found".to_string();
    }

    let rows: Vec<PositionRow> = ledger
        .iter()
        .map(|p| PositionRow {
            ticker: p.name.clone(),
            category: p.category.label().to_string(),
            quantity: p.quantity.to_string(),
            average_cost: format_currency(p.average_cost),
            total_cost: format_currency(p.total_cost()),
            fees: format_decimal_br(p.accumulated_fees),
        })
        .collect();

    Table::new(rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(2..)).with(Alignment::right()))
        .to_string()
}

pub fn format_positions_json(ledger: &PositionLedger) -> String {
    let positions: Vec<_> = ledger.iter().collect();
    serde_json::to_string_pretty(&positions).unwrap_or_else(|_| "[]".to_string())
}

#[derive(Tabled)]
struct ClassifiedRow {
    #[tabled(rename = "Id")]
    id: u64,
    #[tabled(rename = "Data")]
    date: String,
    #[tabled(rename = "Ticker")]
    ticker: String,
    #[tabled(rename = "Operação")]
    operation: String,
    #[tabled(rename = "Regime")]
    regime: String,
    #[tabled(rename = "Quantidade")]
    quantity: u64,
    #[tabled(rename = "Preço")]
    price: String,
    #[tabled(rename = "Taxas")]
    fees: String,
}

fn classified_row(tx: &Transaction) -> ClassifiedRow {
    ClassifiedRow {
        id: tx.operation_id,
        date: tx.operation_date.format("%d/%m/%Y").to_string(),
        ticker: tx.instrument_name.clone(),
        operation: match tx.operation_type {
            OperationType::Purchase => "Compra".to_string(),
            OperationType::Sale => "Venda".to_string(),
        },
        regime: tx.category.label().to_string(),
        quantity: tx.quantity,
        price: format_currency(tx.unit_price),
        fees: format_decimal_br(tx.fees_paid),
    }
}

pub fn format_classification_table(classification: &Classification) -> String {
    let rows: Vec<ClassifiedRow> = Category::ALL
        .iter()
        .flat_map(|c| classification.bucket(*c).iter().map(classified_row))
        .collect();

    let mut output = if rows.is_empty() {
        "No transactions found".to_string()
    } else {
        Table::new(rows).with(Style::rounded()).to_string()
    };

    output.push_str(&format!(
        "\n\n{} fixed income, {} day trade pairs, {} normal, {} merged\n",
        classification.fixed_income.len(),
        classification.day_trade_pairs(),
        classification.normal.len(),
        classification.tombstones.len()
    ));
    output
}

pub fn format_classification_json(classification: &Classification) -> String {
    #[derive(Serialize)]
    struct JsonClassification<'a> {
        fixed_income: &'a [Transaction],
        day_trade: &'a [Transaction],
        normal: &'a [Transaction],
        merged: &'a [Transaction],
    }

    serde_json::to_string_pretty(&JsonClassification {
        fixed_income: &classification.fixed_income,
        day_trade: &classification.day_trade,
        normal: &classification.normal,
        merged: &classification.tombstones,
    })
    .unwrap_or_else(|_| "{}".to_string())
}
