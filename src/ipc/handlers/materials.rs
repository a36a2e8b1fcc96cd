use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{required_i64, required_str, today_ymd, HandlerErr};
use crate::ipc::types::{AppState, Request};
use rusqlite::{Connection, OptionalExtension};
use serde_json::{json, Map};
use std::collections::HashMap;

/// Class sections offered for per-class overrides. This is an explicit list,
/// not a range: there is no class 5 in the school's numbering.
const CLASS_SECTIONS: [i64; 9] = [1, 2, 3, 4, 6, 7, 8, 9, 10];

const WATCHED_TOTAL: i64 = 200;

/// Placeholder engagement figure shown as "watched / 200" until real
/// telemetry exists. Deterministic so dashboards are stable across reloads.
fn watched_partner_count(week_no: i64) -> i64 {
    (week_no - 1 + 5) % 31
}

/// Pull the week number out of a free-text label by keeping only its digits,
/// so "Week 7", "wk7" and "7" all name week 7. Labels with no digits or a
/// number outside the planner range are rejected.
fn parse_week_label(label: &str) -> Option<i64> {
    let digits: String = label.chars().filter(|c| c.is_ascii_digit()).collect();
    let week_no = digits.parse::<i64>().ok()?;
    if (1..=db::WEEK_COUNT).contains(&week_no) {
        Some(week_no)
    } else {
        None
    }
}

#[derive(Debug, Clone)]
struct WeekRow {
    week_no: i64,
    label: String,
    video_title: String,
    video_url: String,
    notes_title: String,
    notes_url: String,
    posted_at: String,
    locked: bool,
}

fn week_from_row(r: &rusqlite::Row<'_>) -> rusqlite::Result<WeekRow> {
    Ok(WeekRow {
        week_no: r.get(0)?,
        label: r.get(1)?,
        video_title: r.get(2)?,
        video_url: r.get(3)?,
        notes_title: r.get(4)?,
        notes_url: r.get(5)?,
        posted_at: r.get(6)?,
        locked: r.get::<_, i64>(7)? != 0,
    })
}

const WEEK_COLUMNS: &str =
    "week_no, label, video_title, video_url, notes_title, notes_url, posted_at, locked";

fn get_week(conn: &Connection, week_no: i64) -> Result<WeekRow, HandlerErr> {
    conn.query_row(
        &format!("SELECT {WEEK_COLUMNS} FROM weekly_materials WHERE week_no = ?"),
        [week_no],
        |r| week_from_row(r),
    )
    .optional()?
    .ok_or_else(|| HandlerErr::new("not_found", "week not found"))
}

fn class_links_for_week(
    conn: &Connection,
    week_no: i64,
) -> Result<HashMap<i64, (String, String)>, HandlerErr> {
    let mut stmt = conn.prepare(
        "SELECT class_no, video_url, notes_url
         FROM class_links
         WHERE week_no = ?
         ORDER BY class_no",
    )?;
    let rows = stmt
        .query_map([week_no], |r| {
            Ok((r.get::<_, i64>(0)?, (r.get(1)?, r.get(2)?)))
        })?
        .collect::<Result<Vec<(i64, (String, String))>, _>>()?;
    Ok(rows.into_iter().collect())
}

fn materials_list(conn: &Connection) -> Result<serde_json::Value, HandlerErr> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {WEEK_COLUMNS} FROM weekly_materials ORDER BY week_no"
    ))?;
    let weeks = stmt
        .query_map([], |r| week_from_row(r))?
        .collect::<Result<Vec<_>, _>>()?;

    let materials: Vec<serde_json::Value> = weeks
        .iter()
        .map(|w| {
            json!({
                "weekNo": w.week_no,
                "label": w.label,
                "videoTitle": w.video_title,
                "videoUrl": w.video_url,
                "notesTitle": w.notes_title,
                "notesUrl": w.notes_url,
                "postedAt": w.posted_at,
                "locked": w.locked,
                "watchedCount": watched_partner_count(w.week_no),
                "watchedTotal": WATCHED_TOTAL
            })
        })
        .collect();

    Ok(json!({ "materials": materials }))
}

fn materials_upload(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let week_label = required_str(params, "week")?;
    let video_title = required_str(params, "videoTitle")?;
    let video_url = required_str(params, "videoUrl")?;
    let notes_title = required_str(params, "notesTitle")?;
    let notes_url = required_str(params, "notesUrl")?;

    let Some(week_no) = parse_week_label(&week_label) else {
        return Err(HandlerErr::new(
            "bad_params",
            format!("week must name a week between 1 and {}", db::WEEK_COUNT),
        ));
    };

    // Uploading re-derives the lock from week position alone; a manual
    // toggle applied earlier is discarded. Weeks past the third start locked.
    let locked = week_no > 3;
    let posted_at = today_ymd();
    conn.execute(
        "UPDATE weekly_materials
         SET video_title = ?, video_url = ?, notes_title = ?, notes_url = ?,
             posted_at = ?, locked = ?
         WHERE week_no = ?",
        (
            &video_title,
            &video_url,
            &notes_title,
            &notes_url,
            &posted_at,
            locked as i64,
            week_no,
        ),
    )
    .map_err(|e| HandlerErr {
        code: "db_update_failed",
        message: e.to_string(),
        details: Some(json!({ "table": "weekly_materials" })),
    })?;

    Ok(json!({
        "weekNo": week_no,
        "postedAt": posted_at,
        "locked": locked
    }))
}

fn materials_toggle_lock(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let week_no = required_i64(params, "weekNo")?;
    let week = get_week(conn, week_no)?;

    let locked = !week.locked;
    conn.execute(
        "UPDATE weekly_materials SET locked = ? WHERE week_no = ?",
        (locked as i64, week_no),
    )
    .map_err(|e| HandlerErr {
        code: "db_update_failed",
        message: e.to_string(),
        details: Some(json!({ "table": "weekly_materials" })),
    })?;

    Ok(json!({ "weekNo": week_no, "locked": locked }))
}

fn materials_class_links_get(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let week_no = required_i64(params, "weekNo")?;
    let week = get_week(conn, week_no)?;
    let stored = class_links_for_week(conn, week_no)?;

    let mut links = Map::new();
    for (class_no, (video_url, notes_url)) in &stored {
        links.insert(
            class_no.to_string(),
            json!({ "videoUrl": video_url, "notesUrl": notes_url }),
        );
    }

    Ok(json!({
        "weekNo": week_no,
        "label": week.label,
        "classSections": CLASS_SECTIONS,
        "classLinks": links
    }))
}

fn materials_class_links_save(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let week_no = required_i64(params, "weekNo")?;
    let _ = get_week(conn, week_no)?;

    let Some(links_obj) = params.get("classLinks").and_then(|v| v.as_object()) else {
        return Err(HandlerErr::new("bad_params", "missing classLinks"));
    };

    let mut entries: Vec<(i64, String, String)> = Vec::with_capacity(links_obj.len());
    for (key, value) in links_obj {
        let class_no = key
            .parse::<i64>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| {
                HandlerErr::new(
                    "bad_params",
                    format!("classLinks key must be a positive integer, got {:?}", key),
                )
            })?;
        let video_url = value
            .get("videoUrl")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .trim()
            .to_string();
        let notes_url = value
            .get("notesUrl")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .trim()
            .to_string();
        entries.push((class_no, video_url, notes_url));
    }
    entries.sort_by_key(|(class_no, _, _)| *class_no);

    // Saving replaces the week's whole mapping; stored links absent from the
    // submitted set are dropped, not merged.
    let tx = conn.unchecked_transaction().map_err(|e| HandlerErr {
        code: "db_tx_failed",
        message: e.to_string(),
        details: None,
    })?;
    tx.execute("DELETE FROM class_links WHERE week_no = ?", [week_no])
        .map_err(|e| HandlerErr {
            code: "db_delete_failed",
            message: e.to_string(),
            details: Some(json!({ "table": "class_links" })),
        })?;
    for (class_no, video_url, notes_url) in &entries {
        tx.execute(
            "INSERT INTO class_links(week_no, class_no, video_url, notes_url)
             VALUES(?, ?, ?, ?)",
            (week_no, class_no, video_url, notes_url),
        )
        .map_err(|e| HandlerErr {
            code: "db_insert_failed",
            message: e.to_string(),
            details: Some(json!({ "table": "class_links" })),
        })?;
    }
    tx.commit().map_err(|e| HandlerErr {
        code: "db_commit_failed",
        message: e.to_string(),
        details: None,
    })?;

    Ok(json!({ "weekNo": week_no, "classCount": entries.len() }))
}

fn materials_view(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let week_no = required_i64(params, "weekNo")?;
    let week = get_week(conn, week_no)?;
    if week.locked {
        return Err(HandlerErr::new("locked", "week is locked"));
    }

    let stored = class_links_for_week(conn, week_no)?;
    let classes: Vec<serde_json::Value> = CLASS_SECTIONS
        .iter()
        .map(|class_no| {
            let (video_url, notes_url) = stored
                .get(class_no)
                .map(|(v, n)| (non_empty(v), non_empty(n)))
                .unwrap_or((None, None));
            json!({
                "classNo": class_no,
                "videoUrl": video_url,
                "notesUrl": notes_url
            })
        })
        .collect();

    Ok(json!({
        "weekNo": week.week_no,
        "label": week.label,
        "videoTitle": week.video_title,
        "videoUrl": week.video_url,
        "notesTitle": week.notes_title,
        "notesUrl": week.notes_url,
        "postedAt": week.posted_at,
        "classes": classes
    }))
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

fn with_conn(
    state: &mut AppState,
    req: &Request,
    f: impl FnOnce(&Connection, &serde_json::Value) -> Result<serde_json::Value, HandlerErr>,
) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match f(conn, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "materials.list" => Some(with_conn(state, req, |c, _| materials_list(c))),
        "materials.upload" => Some(with_conn(state, req, materials_upload)),
        "materials.toggleLock" => Some(with_conn(state, req, materials_toggle_lock)),
        "materials.classLinks.get" => Some(with_conn(state, req, materials_class_links_get)),
        "materials.classLinks.save" => Some(with_conn(state, req, materials_class_links_save)),
        "materials.view" => Some(with_conn(state, req, materials_view)),
        _ => None,
    }
}
