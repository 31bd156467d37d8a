use std::sync::Arc;

use async_trait::async_trait;
use procura_core::{AppError, AppResult};
use procura_domain::{ActionType, EntityKind, EntityReference};
use serde_json::json;

use super::schemas::{
    ApproveInvoicePayload, CompareQuotesPayload, InvoiceDraftPayload, InventoryWhatIfPayload,
    PaymentDraftPayload, PoDraftPayload, ReceiptDraftPayload, RfqDraftPayload,
    SupplierMessagePayload, parse_payload, round_money,
};
use super::{ActionConverter, ConversionContext, PreparedEntity};

/// Returns one converter per action type.
#[must_use]
pub fn default_converters() -> Vec<Arc<dyn ActionConverter>> {
    vec![
        Arc::new(RfqDraftConverter),
        Arc::new(SupplierMessageConverter),
        Arc::new(InventoryWhatIfConverter),
        Arc::new(CompareQuotesConverter),
        Arc::new(PoDraftConverter),
        Arc::new(ReceiptDraftConverter),
        Arc::new(InvoiceDraftConverter),
        Arc::new(ApproveInvoiceConverter),
        Arc::new(PaymentDraftConverter),
    ]
}

async fn require_existing_invoice(context: &ConversionContext<'_>, invoice_id: &str) -> AppResult<()> {
    let reference = EntityReference::new(EntityKind::Invoice, invoice_id)?;
    if context
        .entity_store
        .entity_exists(context.tenant_id, &reference)
        .await?
    {
        return Ok(());
    }

    Err(AppError::Validation(format!(
        "invoice '{invoice_id}' does not exist in this company"
    )))
}

struct RfqDraftConverter;

#[async_trait]
impl ActionConverter for RfqDraftConverter {
    fn action_type(&self) -> ActionType {
        ActionType::RfqDraft
    }

    async fn prepare(&self, context: &ConversionContext<'_>) -> AppResult<Vec<PreparedEntity>> {
        let mut payload: RfqDraftPayload = parse_payload(self.action_type(), context.payload)?;
        payload.validate()?;

        Ok(vec![PreparedEntity {
            entity_kind: EntityKind::Rfq,
            data: json!({
                "title": payload.title.trim(),
                "description": payload.description,
                "currency": payload.currency,
                "due_date": payload.due_date,
                "items": payload.items,
                "supplier_ids": payload.supplier_ids,
                "status": "draft",
                "source_draft_id": context.draft_id,
            }),
        }])
    }
}

struct SupplierMessageConverter;

#[async_trait]
impl ActionConverter for SupplierMessageConverter {
    fn action_type(&self) -> ActionType {
        ActionType::SupplierMessage
    }

    async fn prepare(&self, context: &ConversionContext<'_>) -> AppResult<Vec<PreparedEntity>> {
        let payload: SupplierMessagePayload = parse_payload(self.action_type(), context.payload)?;
        payload.validate()?;

        Ok(vec![PreparedEntity {
            entity_kind: EntityKind::SupplierMessage,
            data: json!({
                "supplier_id": payload.supplier_id,
                "subject": payload.subject.trim(),
                "body": payload.body,
                "rfq_id": payload.rfq_id,
                "status": "draft",
                "source_draft_id": context.draft_id,
            }),
        }])
    }
}

/// Produces a net-new analytical snapshot; nothing existing is mutated.
struct InventoryWhatIfConverter;

#[async_trait]
impl ActionConverter for InventoryWhatIfConverter {
    fn action_type(&self) -> ActionType {
        ActionType::InventoryWhatIf
    }

    async fn prepare(&self, context: &ConversionContext<'_>) -> AppResult<Vec<PreparedEntity>> {
        let payload: InventoryWhatIfPayload = parse_payload(self.action_type(), context.payload)?;
        payload.validate()?;

        let adjusted_daily_demand = payload.daily_demand * (1.0 + payload.demand_change_pct / 100.0);
        let horizon = f64::from(payload.horizon_days);
        let days_of_cover = (adjusted_daily_demand > 0.0).then(|| payload.on_hand / adjusted_daily_demand);
        let replenished = payload
            .reorder_quantity
            .filter(|_| payload.lead_time_days <= payload.horizon_days)
            .unwrap_or(0.0);
        let projected_on_hand = payload.on_hand + replenished - adjusted_daily_demand * horizon;
        let stockout_day = days_of_cover
            .filter(|days| *days < horizon)
            .map(|days| days.floor());
        let reorder_recommended =
            days_of_cover.is_some_and(|days| days <= f64::from(payload.lead_time_days));

        Ok(vec![PreparedEntity {
            entity_kind: EntityKind::InventoryScenarioSnapshot,
            data: json!({
                "item_id": payload.item_id,
                "scenario_name": payload.scenario_name,
                "inputs": {
                    "on_hand": payload.on_hand,
                    "daily_demand": payload.daily_demand,
                    "demand_change_pct": payload.demand_change_pct,
                    "lead_time_days": payload.lead_time_days,
                    "horizon_days": payload.horizon_days,
                    "reorder_quantity": payload.reorder_quantity,
                },
                "results": {
                    "adjusted_daily_demand": round_money(adjusted_daily_demand),
                    "days_of_cover": days_of_cover.map(round_money),
                    "projected_on_hand": round_money(projected_on_hand),
                    "stockout_day": stockout_day,
                    "reorder_recommended": reorder_recommended,
                },
                "source_draft_id": context.draft_id,
            }),
        }])
    }
}

/// Produces a net-new comparison snapshot ranking quotes by price then lead time.
struct CompareQuotesConverter;

#[async_trait]
impl ActionConverter for CompareQuotesConverter {
    fn action_type(&self) -> ActionType {
        ActionType::CompareQuotes
    }

    async fn prepare(&self, context: &ConversionContext<'_>) -> AppResult<Vec<PreparedEntity>> {
        let mut payload: CompareQuotesPayload = parse_payload(self.action_type(), context.payload)?;
        payload.validate()?;

        let mut ranked = payload.quotes.clone();
        ranked.sort_by(|left, right| {
            left.total_price
                .total_cmp(&right.total_price)
                .then(left.lead_time_days.unwrap_or(u32::MAX).cmp(&right.lead_time_days.unwrap_or(u32::MAX)))
        });
        let recommended_quote_id = ranked.first().map(|quote| quote.quote_id.clone());

        Ok(vec![PreparedEntity {
            entity_kind: EntityKind::QuoteComparison,
            data: json!({
                "rfq_id": payload.rfq_id,
                "currency": payload.currency,
                "ranking": ranked,
                "recommended_quote_id": recommended_quote_id,
                "source_draft_id": context.draft_id,
            }),
        }])
    }
}

struct PoDraftConverter;

#[async_trait]
impl ActionConverter for PoDraftConverter {
    fn action_type(&self) -> ActionType {
        ActionType::PoDraft
    }

    async fn prepare(&self, context: &ConversionContext<'_>) -> AppResult<Vec<PreparedEntity>> {
        let mut payload: PoDraftPayload = parse_payload(self.action_type(), context.payload)?;
        let total = payload.validate()?;

        Ok(vec![PreparedEntity {
            entity_kind: EntityKind::PurchaseOrder,
            data: json!({
                "supplier_id": payload.supplier_id,
                "currency": payload.currency,
                "rfq_id": payload.rfq_id,
                "quote_id": payload.quote_id,
                "delivery_date": payload.delivery_date,
                "lines": payload.lines,
                "total": total,
                "status": "draft",
                "source_draft_id": context.draft_id,
            }),
        }])
    }
}

/// Produces the receipt plus one non-conformance per line with rejected goods.
struct ReceiptDraftConverter;

#[async_trait]
impl ActionConverter for ReceiptDraftConverter {
    fn action_type(&self) -> ActionType {
        ActionType::ReceiptDraft
    }

    async fn prepare(&self, context: &ConversionContext<'_>) -> AppResult<Vec<PreparedEntity>> {
        let payload: ReceiptDraftPayload = parse_payload(self.action_type(), context.payload)?;
        payload.validate()?;

        let mut entities = vec![PreparedEntity {
            entity_kind: EntityKind::Receipt,
            data: json!({
                "purchase_order_id": payload.purchase_order_id,
                "received_on": payload.received_on,
                "lines": payload.lines,
                "source_draft_id": context.draft_id,
            }),
        }];

        entities.extend(
            payload
                .lines
                .iter()
                .enumerate()
                .filter(|(_, line)| line.quantity_rejected() > 0.0)
                .map(|(position, line)| PreparedEntity {
                    entity_kind: EntityKind::NonConformance,
                    data: json!({
                        "purchase_order_id": payload.purchase_order_id,
                        "receipt_line": position,
                        "description": line.description,
                        "quantity_rejected": line.quantity_rejected(),
                        "reason": line.rejection_reason,
                        "status": "open",
                        "source_draft_id": context.draft_id,
                    }),
                }),
        );

        Ok(entities)
    }
}

struct InvoiceDraftConverter;

#[async_trait]
impl ActionConverter for InvoiceDraftConverter {
    fn action_type(&self) -> ActionType {
        ActionType::InvoiceDraft
    }

    async fn prepare(&self, context: &ConversionContext<'_>) -> AppResult<Vec<PreparedEntity>> {
        let mut payload: InvoiceDraftPayload = parse_payload(self.action_type(), context.payload)?;
        let total = payload.validate()?;

        Ok(vec![PreparedEntity {
            entity_kind: EntityKind::Invoice,
            data: json!({
                "supplier_id": payload.supplier_id,
                "invoice_number": payload.invoice_number.trim(),
                "currency": payload.currency,
                "invoice_date": payload.invoice_date,
                "due_date": payload.due_date,
                "purchase_order_id": payload.purchase_order_id,
                "lines": payload.lines,
                "tax_amount": payload.tax_amount,
                "total": total,
                "status": "draft",
                "source_draft_id": context.draft_id,
            }),
        }])
    }
}

/// Records an approval decision against an invoice that must already exist.
struct ApproveInvoiceConverter;

#[async_trait]
impl ActionConverter for ApproveInvoiceConverter {
    fn action_type(&self) -> ActionType {
        ActionType::ApproveInvoice
    }

    async fn prepare(&self, context: &ConversionContext<'_>) -> AppResult<Vec<PreparedEntity>> {
        let payload: ApproveInvoicePayload = parse_payload(self.action_type(), context.payload)?;
        payload.validate()?;
        require_existing_invoice(context, &payload.invoice_id).await?;

        Ok(vec![PreparedEntity {
            entity_kind: EntityKind::InvoiceApproval,
            data: json!({
                "invoice_id": payload.invoice_id,
                "note": payload.note,
                "decision": "approved",
                "source_draft_id": context.draft_id,
            }),
        }])
    }
}

struct PaymentDraftConverter;

#[async_trait]
impl ActionConverter for PaymentDraftConverter {
    fn action_type(&self) -> ActionType {
        ActionType::PaymentDraft
    }

    async fn prepare(&self, context: &ConversionContext<'_>) -> AppResult<Vec<PreparedEntity>> {
        let mut payload: PaymentDraftPayload = parse_payload(self.action_type(), context.payload)?;
        payload.validate()?;
        require_existing_invoice(context, &payload.invoice_id).await?;

        Ok(vec![PreparedEntity {
            entity_kind: EntityKind::Payment,
            data: json!({
                "invoice_id": payload.invoice_id,
                "amount": round_money(payload.amount),
                "currency": payload.currency,
                "scheduled_for": payload.scheduled_for,
                "method": payload.method,
                "status": "draft",
                "source_draft_id": context.draft_id,
            }),
        }])
    }
}
