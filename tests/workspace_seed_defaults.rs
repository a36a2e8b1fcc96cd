
use serde_json::json;
use test_support::{request_ok, spawn_sidecar, temp_dir};

#[test]
fn fresh_workspace_seeds_partners_and_weeks() {
    let workspace = temp_dir("tutorhub-seed");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let listing = request_ok(&mut stdin, &mut reader, "2", "deliveries.list", json!({}));
    let partners = listing
        .get("partners")
        .and_then(|v| v.as_array())
        .cloned()
        .expect("partners array");
    assert_eq!(partners.len(), 55);
    assert_eq!(listing.get("totalPartners").and_then(|v| v.as_i64()), Some(55));

    // Seed order follows partner id, and names cycle a 30-name roster.
    assert_eq!(
        partners[0].get("partnerId").and_then(|v| v.as_i64()),
        Some(1)
    );
    assert_eq!(
        partners[54].get("partnerId").and_then(|v| v.as_i64()),
        Some(55)
    );
    assert_eq!(
        partners[0].get("partnerName").and_then(|v| v.as_str()),
        Some("Aarav Sharma")
    );
    assert_eq!(
        partners[0].get("partnerName").and_then(|v| v.as_str()),
        partners[30].get("partnerName").and_then(|v| v.as_str())
    );

    for partner in &partners {
        let items = partner
            .get("items")
            .and_then(|v| v.as_array())
            .cloned()
            .expect("items array");
        assert_eq!(items.len(), 3);
        let names: Vec<&str> = items
            .iter()
            .filter_map(|i| i.get("name").and_then(|v| v.as_str()))
            .collect();
        assert_eq!(names, ["Tablet", "Charger", "SIM Card"]);
        for item in &items {
            assert_eq!(item.get("delivered").and_then(|v| v.as_bool()), Some(false));
            assert!(item.get("deliveryDate").expect("deliveryDate key").is_null());
        }
    }

    let materials = request_ok(&mut stdin, &mut reader, "3", "materials.list", json!({}));
    let weeks = materials
        .get("materials")
        .and_then(|v| v.as_array())
        .cloned()
        .expect("materials array");
    assert_eq!(weeks.len(), 50);

    for (idx, week) in weeks.iter().enumerate() {
        let week_no = (idx + 1) as i64;
        assert_eq!(week.get("weekNo").and_then(|v| v.as_i64()), Some(week_no));
        assert_eq!(
            week.get("label").and_then(|v| v.as_str()),
            Some(format!("Week {}", week_no).as_str())
        );
        let locked = week.get("locked").and_then(|v| v.as_bool()).expect("locked");
        if week_no <= 3 {
            assert!(!locked, "week {} should start unlocked", week_no);
            assert_eq!(
                week.get("videoTitle").and_then(|v| v.as_str()),
                Some(format!("Video for Week {}", week_no).as_str())
            );
            assert_eq!(
                week.get("postedAt").and_then(|v| v.as_str()),
                Some(format!("2025-08-2{}", week_no).as_str())
            );
        } else {
            assert!(locked, "week {} should start locked", week_no);
            assert_eq!(week.get("videoTitle").and_then(|v| v.as_str()), Some(""));
            assert_eq!(week.get("postedAt").and_then(|v| v.as_str()), Some(""));
        }
        assert_eq!(
            week.get("watchedCount").and_then(|v| v.as_i64()),
            Some((week_no - 1 + 5) % 31)
        );
        assert_eq!(week.get("watchedTotal").and_then(|v| v.as_i64()), Some(200));
    }
}

#[test]
fn reopening_a_workspace_never_reseeds() {
    let workspace = temp_dir("tutorhub-reopen");

    {
        let (mut child, mut stdin, mut reader) = spawn_sidecar();
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            "1",
            "workspace.select",
            json!({ "path": workspace.to_string_lossy() }),
        );
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            "2",
            "deliveries.markDelivered",
            json!({ "partnerId": 12, "componentId": 2 }),
        );
        drop(stdin);
        let _ = child.wait();
    }

    // A second process over the same workspace sees the delivered flag, not
    // a fresh seed.
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let listing = request_ok(&mut stdin, &mut reader, "2", "deliveries.list", json!({}));
    let partners = listing
        .get("partners")
        .and_then(|v| v.as_array())
        .cloned()
        .expect("partners array");
    assert_eq!(partners.len(), 55);

    let partner12 = partners
        .iter()
        .find(|p| p.get("partnerId").and_then(|v| v.as_i64()) == Some(12))
        .expect("partner 12");
    let charger = partner12
        .get("items")
        .and_then(|v| v.as_array())
        .and_then(|items| {
            items
                .iter()
                .find(|i| i.get("componentId").and_then(|v| v.as_i64()) == Some(2))
                .cloned()
        })
        .expect("component 2");
    assert_eq!(charger.get("delivered").and_then(|v| v.as_bool()), Some(true));
    assert!(charger
        .get("deliveryDate")
        .and_then(|v| v.as_str())
        .is_some());
}
