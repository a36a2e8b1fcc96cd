use rusqlite::Connection;
use std::path::Path;

/// Fixed tutor roster used to label seeded partners. Partner names cycle
/// through this list deterministically so a fresh workspace always looks the
/// same.
pub const TUTOR_ROSTER: [&str; 30] = [
    "Aarav Sharma",
    "Priya Singh",
    "Vivaan Patel",
    "Anaya Gupta",
    "Ishaan Joshi",
    "Diya Mehra",
    "Kabir Kapoor",
    "Aanya Reddy",
    "Arjun Nair",
    "Myra Das",
    "Reyansh Rao",
    "Kiara Jain",
    "Advait Sethi",
    "Saanvi Bhatia",
    "Ayaan Choudhary",
    "Pari Malhotra",
    "Vihaan Sinha",
    "Navya Ghosh",
    "Dhruv Yadav",
    "Riya Verma",
    "Arnav Agarwal",
    "Sara Menon",
    "Yuvraj Pillai",
    "Meera Desai",
    "Krish Shetty",
    "Tara Iyer",
    "Shaurya Dutta",
    "Inaaya Paul",
    "Aadhya Bhatt",
    "Rudra Saxena",
];

pub const SEED_PARTNER_COUNT: i64 = 55;
pub const WEEK_COUNT: i64 = 50;

/// Hardware handed to every partner. Component ids are stable per partner.
const COMPONENT_CATALOG: [(i64, &str); 3] = [(1, "Tablet"), (2, "Charger"), (3, "SIM Card")];

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join("tutorhub.sqlite3");
    let conn = Connection::open(db_path)?;
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS partners(
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            sort_order INTEGER NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS delivery_items(
            partner_id INTEGER NOT NULL,
            component_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            delivered INTEGER NOT NULL DEFAULT 0,
            delivery_date TEXT,
            PRIMARY KEY(partner_id, component_id),
            FOREIGN KEY(partner_id) REFERENCES partners(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_delivery_items_partner ON delivery_items(partner_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS weekly_materials(
            week_no INTEGER PRIMARY KEY,
            label TEXT NOT NULL,
            video_title TEXT NOT NULL DEFAULT '',
            video_url TEXT NOT NULL DEFAULT '',
            notes_title TEXT NOT NULL DEFAULT '',
            notes_url TEXT NOT NULL DEFAULT '',
            posted_at TEXT NOT NULL DEFAULT '',
            locked INTEGER NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS class_links(
            week_no INTEGER NOT NULL,
            class_no INTEGER NOT NULL,
            video_url TEXT NOT NULL DEFAULT '',
            notes_url TEXT NOT NULL DEFAULT '',
            PRIMARY KEY(week_no, class_no),
            FOREIGN KEY(week_no) REFERENCES weekly_materials(week_no)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_class_links_week ON class_links(week_no)",
        [],
    )?;

    // Existing workspaces may have a partners table without sort_order. Add and backfill if needed.
    ensure_partners_sort_order(&conn)?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_partners_sort ON partners(sort_order)",
        [],
    )?;

    seed_if_empty(&conn)?;

    Ok(conn)
}

fn ensure_partners_sort_order(conn: &Connection) -> anyhow::Result<()> {
    // If the column already exists, we're done.
    if table_has_column(conn, "partners", "sort_order")? {
        return Ok(());
    }

    conn.execute(
        "ALTER TABLE partners ADD COLUMN sort_order INTEGER NOT NULL DEFAULT 0",
        [],
    )?;

    // Backfill using existing insert order as a best-effort.
    let mut stmt = conn.prepare("SELECT id FROM partners ORDER BY rowid")?;
    let partner_ids = stmt
        .query_map([], |row| row.get::<_, i64>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    for (i, pid) in partner_ids.iter().enumerate() {
        conn.execute(
            "UPDATE partners SET sort_order = ? WHERE id = ?",
            (i as i64, pid),
        )?;
    }

    Ok(())
}

/// First-open bootstrap. A workspace that already holds partners or weeks is
/// left alone; reopening never reseeds.
fn seed_if_empty(conn: &Connection) -> anyhow::Result<()> {
    let partner_count: i64 = conn.query_row("SELECT COUNT(*) FROM partners", [], |r| r.get(0))?;
    let week_count: i64 =
        conn.query_row("SELECT COUNT(*) FROM weekly_materials", [], |r| r.get(0))?;
    if partner_count > 0 || week_count > 0 {
        return Ok(());
    }

    let tx = conn.unchecked_transaction()?;

    for id in 1..=SEED_PARTNER_COUNT {
        let name = TUTOR_ROSTER[((id - 1) as usize) % TUTOR_ROSTER.len()];
        tx.execute(
            "INSERT INTO partners(id, name, sort_order) VALUES(?, ?, ?)",
            (id, name, id - 1),
        )?;
        for (component_id, component_name) in COMPONENT_CATALOG {
            tx.execute(
                "INSERT INTO delivery_items(partner_id, component_id, name, delivered, delivery_date)
                 VALUES(?, ?, ?, 0, NULL)",
                (id, component_id, component_name),
            )?;
        }
    }

    // Weeks 1-3 ship with demo content and start unlocked; the rest are
    // empty and locked until an admin uploads or unlocks them.
    for week_no in 1..=WEEK_COUNT {
        let locked = week_no > 3;
        if locked {
            tx.execute(
                "INSERT INTO weekly_materials(week_no, label, locked)
                 VALUES(?, ?, 1)",
                (week_no, format!("Week {}", week_no)),
            )?;
        } else {
            tx.execute(
                "INSERT INTO weekly_materials(
                    week_no, label, video_title, video_url, notes_title, notes_url, posted_at, locked
                 ) VALUES(?, ?, ?, ?, ?, ?, ?, 0)",
                (
                    week_no,
                    format!("Week {}", week_no),
                    format!("Video for Week {}", week_no),
                    format!("https://www.youtube.com/embed/dQw4w9WgXcQ?week={}", week_no),
                    format!("Notes for Week {}", week_no),
                    format!("https://example.com/notes-week{}.pdf", week_no),
                    format!("2025-08-2{}", week_no),
                ),
            )?;
        }
    }

    tx.commit()?;
    Ok(())
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> anyhow::Result<bool> {
    let sql = format!("PRAGMA table_info({})", table);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}
