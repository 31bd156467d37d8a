use chrono::NaiveDate;
use procura_core::{AppError, AppResult};
use procura_domain::ActionType;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub(super) fn parse_payload<T: DeserializeOwned>(
    action_type: ActionType,
    payload: &Value,
) -> AppResult<T> {
    serde_json::from_value(payload.clone()).map_err(|error| {
        AppError::Validation(format!(
            "{} payload does not match its schema: {error}",
            action_type.as_str()
        ))
    })
}

pub(super) fn require_text(field: &str, value: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("'{field}' must not be empty")));
    }

    Ok(())
}

pub(super) fn require_currency(value: &str) -> AppResult<String> {
    let code = value.trim();
    if code.len() != 3 || !code.chars().all(|character| character.is_ascii_uppercase()) {
        return Err(AppError::Validation(format!(
            "currency '{value}' must be a three-letter ISO 4217 code"
        )));
    }

    Ok(code.to_owned())
}

pub(super) fn require_positive(field: &str, value: f64) -> AppResult<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(AppError::Validation(format!(
            "'{field}' must be greater than zero"
        )));
    }

    Ok(())
}

pub(super) fn require_non_negative(field: &str, value: f64) -> AppResult<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(AppError::Validation(format!("'{field}' must not be negative")));
    }

    Ok(())
}

pub(super) fn require_items<T>(field: &str, items: &[T]) -> AppResult<()> {
    if items.is_empty() {
        return Err(AppError::Validation(format!(
            "'{field}' must contain at least one entry"
        )));
    }

    Ok(())
}

pub(super) fn round_money(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub(super) struct RequestedItem {
    pub description: String,
    pub quantity: f64,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub target_unit_price: Option<f64>,
}

impl RequestedItem {
    fn validate(&self, position: usize) -> AppResult<()> {
        require_text(&format!("items[{position}].description"), &self.description)?;
        require_positive(&format!("items[{position}].quantity"), self.quantity)?;
        if let Some(price) = self.target_unit_price {
            require_non_negative(&format!("items[{position}].target_unit_price"), price)?;
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub(super) struct PricedLine {
    pub description: String,
    pub quantity: f64,
    pub unit_price: f64,
}

impl PricedLine {
    fn validate(&self, position: usize) -> AppResult<()> {
        require_text(&format!("lines[{position}].description"), &self.description)?;
        require_positive(&format!("lines[{position}].quantity"), self.quantity)?;
        require_non_negative(&format!("lines[{position}].unit_price"), self.unit_price)
    }

    pub fn total(&self) -> f64 {
        round_money(self.quantity * self.unit_price)
    }
}

fn validate_priced_lines(lines: &[PricedLine]) -> AppResult<f64> {
    require_items("lines", lines)?;
    let mut total = 0.0;
    for (position, line) in lines.iter().enumerate() {
        line.validate(position)?;
        total += line.total();
    }

    Ok(round_money(total))
}

#[derive(Debug, Clone, Deserialize)]
pub(super) struct RfqDraftPayload {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub currency: String,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    pub items: Vec<RequestedItem>,
    #[serde(default)]
    pub supplier_ids: Vec<String>,
}

impl RfqDraftPayload {
    pub fn validate(&mut self) -> AppResult<()> {
        require_text("title", &self.title)?;
        self.currency = require_currency(&self.currency)?;
        require_items("items", &self.items)?;
        for (position, item) in self.items.iter().enumerate() {
            item.validate(position)?;
        }
        for (position, supplier_id) in self.supplier_ids.iter().enumerate() {
            require_text(&format!("supplier_ids[{position}]"), supplier_id)?;
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(super) struct SupplierMessagePayload {
    pub supplier_id: String,
    pub subject: String,
    pub body: String,
    #[serde(default)]
    pub rfq_id: Option<String>,
}

impl SupplierMessagePayload {
    pub fn validate(&self) -> AppResult<()> {
        require_text("supplier_id", &self.supplier_id)?;
        require_text("subject", &self.subject)?;
        require_text("body", &self.body)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(super) struct InventoryWhatIfPayload {
    pub item_id: String,
    #[serde(default)]
    pub scenario_name: Option<String>,
    pub on_hand: f64,
    pub daily_demand: f64,
    #[serde(default)]
    pub demand_change_pct: f64,
    pub lead_time_days: u32,
    pub horizon_days: u32,
    #[serde(default)]
    pub reorder_quantity: Option<f64>,
}

impl InventoryWhatIfPayload {
    pub fn validate(&self) -> AppResult<()> {
        require_text("item_id", &self.item_id)?;
        require_non_negative("on_hand", self.on_hand)?;
        require_non_negative("daily_demand", self.daily_demand)?;
        if !self.demand_change_pct.is_finite() || self.demand_change_pct <= -100.0 {
            return Err(AppError::Validation(
                "'demand_change_pct' must be greater than -100".to_owned(),
            ));
        }
        if self.horizon_days == 0 {
            return Err(AppError::Validation(
                "'horizon_days' must be greater than zero".to_owned(),
            ));
        }
        if let Some(quantity) = self.reorder_quantity {
            require_positive("reorder_quantity", quantity)?;
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub(super) struct QuoteCandidate {
    pub quote_id: String,
    pub supplier_id: String,
    pub total_price: f64,
    #[serde(default)]
    pub lead_time_days: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub(super) struct CompareQuotesPayload {
    pub rfq_id: String,
    pub currency: String,
    pub quotes: Vec<QuoteCandidate>,
}

impl CompareQuotesPayload {
    pub fn validate(&mut self) -> AppResult<()> {
        require_text("rfq_id", &self.rfq_id)?;
        self.currency = require_currency(&self.currency)?;
        if self.quotes.len() < 2 {
            return Err(AppError::Validation(
                "'quotes' must contain at least two quotes to compare".to_owned(),
            ));
        }
        for (position, quote) in self.quotes.iter().enumerate() {
            require_text(&format!("quotes[{position}].quote_id"), &quote.quote_id)?;
            require_text(&format!("quotes[{position}].supplier_id"), &quote.supplier_id)?;
            require_non_negative(&format!("quotes[{position}].total_price"), quote.total_price)?;
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(super) struct PoDraftPayload {
    pub supplier_id: String,
    pub currency: String,
    #[serde(default)]
    pub rfq_id: Option<String>,
    #[serde(default)]
    pub quote_id: Option<String>,
    #[serde(default)]
    pub delivery_date: Option<NaiveDate>,
    pub lines: Vec<PricedLine>,
}

impl PoDraftPayload {
    pub fn validate(&mut self) -> AppResult<f64> {
        require_text("supplier_id", &self.supplier_id)?;
        self.currency = require_currency(&self.currency)?;
        validate_priced_lines(&self.lines)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub(super) struct ReceiptLine {
    pub description: String,
    pub quantity_received: f64,
    pub quantity_accepted: f64,
    #[serde(default)]
    pub rejection_reason: Option<String>,
}

impl ReceiptLine {
    pub fn quantity_rejected(&self) -> f64 {
        self.quantity_received - self.quantity_accepted
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(super) struct ReceiptDraftPayload {
    pub purchase_order_id: String,
    pub received_on: NaiveDate,
    pub lines: Vec<ReceiptLine>,
}

impl ReceiptDraftPayload {
    pub fn validate(&self) -> AppResult<()> {
        require_text("purchase_order_id", &self.purchase_order_id)?;
        require_items("lines", &self.lines)?;
        for (position, line) in self.lines.iter().enumerate() {
            require_text(&format!("lines[{position}].description"), &line.description)?;
            require_positive(
                &format!("lines[{position}].quantity_received"),
                line.quantity_received,
            )?;
            require_non_negative(
                &format!("lines[{position}].quantity_accepted"),
                line.quantity_accepted,
            )?;
            if line.quantity_accepted > line.quantity_received {
                return Err(AppError::Validation(format!(
                    "lines[{position}] accepts more than was received"
                )));
            }
            let has_reason = line
                .rejection_reason
                .as_deref()
                .is_some_and(|reason| !reason.trim().is_empty());
            if line.quantity_rejected() > 0.0 && !has_reason {
                return Err(AppError::Validation(format!(
                    "lines[{position}] rejects goods without a rejection_reason"
                )));
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(super) struct InvoiceDraftPayload {
    pub supplier_id: String,
    pub invoice_number: String,
    pub currency: String,
    pub invoice_date: NaiveDate,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub purchase_order_id: Option<String>,
    pub lines: Vec<PricedLine>,
    #[serde(default)]
    pub tax_amount: f64,
}

impl InvoiceDraftPayload {
    pub fn validate(&mut self) -> AppResult<f64> {
        require_text("supplier_id", &self.supplier_id)?;
        require_text("invoice_number", &self.invoice_number)?;
        self.currency = require_currency(&self.currency)?;
        if self.due_date < self.invoice_date {
            return Err(AppError::Validation(
                "'due_date' must not be before 'invoice_date'".to_owned(),
            ));
        }
        require_non_negative("tax_amount", self.tax_amount)?;
        let subtotal = validate_priced_lines(&self.lines)?;

        Ok(round_money(subtotal + self.tax_amount))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(super) struct ApproveInvoicePayload {
    pub invoice_id: String,
    #[serde(default)]
    pub note: Option<String>,
}

impl ApproveInvoicePayload {
    pub fn validate(&self) -> AppResult<()> {
        require_text("invoice_id", &self.invoice_id)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(super) struct PaymentDraftPayload {
    pub invoice_id: String,
    pub amount: f64,
    pub currency: String,
    pub scheduled_for: NaiveDate,
    #[serde(default)]
    pub method: Option<String>,
}

impl PaymentDraftPayload {
    pub fn validate(&mut self) -> AppResult<()> {
        require_text("invoice_id", &self.invoice_id)?;
        require_positive("amount", self.amount)?;
        self.currency = require_currency(&self.currency)?;

        Ok(())
    }
}
