use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{required_i64, today_ymd, HandlerErr};
use crate::ipc::types::{AppState, Request};
use rusqlite::{Connection, OptionalExtension};
use serde_json::json;

#[derive(Debug, Clone)]
struct PartnerRow {
    id: i64,
    name: String,
}

fn list_partners(conn: &Connection) -> Result<Vec<PartnerRow>, HandlerErr> {
    let mut stmt = conn.prepare(
        "SELECT id, name
         FROM partners
         ORDER BY sort_order",
    )?;
    let rows = stmt
        .query_map([], |r| {
            Ok(PartnerRow {
                id: r.get(0)?,
                name: r.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn items_json(conn: &Connection, partner_id: i64) -> Result<Vec<serde_json::Value>, HandlerErr> {
    let mut stmt = conn.prepare(
        "SELECT component_id, name, delivered, delivery_date
         FROM delivery_items
         WHERE partner_id = ?
         ORDER BY component_id",
    )?;
    let rows = stmt
        .query_map([partner_id], |r| {
            let delivery_date: Option<String> = r.get(3)?;
            Ok(json!({
                "componentId": r.get::<_, i64>(0)?,
                "name": r.get::<_, String>(1)?,
                "delivered": r.get::<_, i64>(2)? != 0,
                "deliveryDate": delivery_date
            }))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn deliveries_list(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    // Filtering is a read-time view over the partner name; stored rows are
    // never touched by it.
    let filter = params
        .get("filter")
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty());

    let mut partners_json: Vec<serde_json::Value> = Vec::new();
    for partner in list_partners(conn)? {
        if let Some(needle) = &filter {
            if !partner.name.to_lowercase().contains(needle) {
                continue;
            }
        }
        partners_json.push(json!({
            "partnerId": partner.id,
            "partnerName": partner.name,
            "items": items_json(conn, partner.id)?
        }));
    }

    Ok(json!({
        "totalPartners": partners_json.len(),
        "partners": partners_json
    }))
}

fn deliveries_mark_delivered(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let partner_id = required_i64(params, "partnerId")?;
    let component_id = required_i64(params, "componentId")?;

    let existing: Option<(i64, Option<String>)> = conn
        .query_row(
            "SELECT delivered, delivery_date
             FROM delivery_items
             WHERE partner_id = ? AND component_id = ?",
            (partner_id, component_id),
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .optional()?;
    let Some((delivered, delivery_date)) = existing else {
        return Err(HandlerErr::new("not_found", "delivery item not found"));
    };

    // Delivery is one-way; a repeated call keeps the original stamp.
    if delivered != 0 {
        return Ok(json!({
            "partnerId": partner_id,
            "componentId": component_id,
            "delivered": true,
            "deliveryDate": delivery_date
        }));
    }

    let stamp = today_ymd();
    conn.execute(
        "UPDATE delivery_items
         SET delivered = 1, delivery_date = ?
         WHERE partner_id = ? AND component_id = ? AND delivered = 0",
        (&stamp, partner_id, component_id),
    )
    .map_err(|e| HandlerErr {
        code: "db_update_failed",
        message: e.to_string(),
        details: Some(json!({ "table": "delivery_items" })),
    })?;

    Ok(json!({
        "partnerId": partner_id,
        "componentId": component_id,
        "delivered": true,
        "deliveryDate": stamp
    }))
}

fn handle_deliveries_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match deliveries_list(conn, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_deliveries_mark_delivered(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match deliveries_mark_delivered(conn, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "deliveries.list" => Some(handle_deliveries_list(state, req)),
        "deliveries.markDelivered" => Some(handle_deliveries_mark_delivered(state, req)),
        _ => None,
    }
}
