use roster_core::{build_dashboard, AllocationState};
use std::fs;
use std::path::Path;

fn write_record(path: &Path, front_matter: &str, body: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, format!("---\n{front_matter}---\n{body}")).unwrap();
}

fn dataset() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let planning = dir.path().join("planning");
    let identity = dir.path().join("identity");

    write_record(
        &planning.join("people/alice.md"),
        "alias: alice
role_id: Dev
skills: [Rust]
allocations:
  - project: Project-X
    weeks: [2026-W10]
    planned_hours: 20
    capacity_hours: 40
  - project: Project-Y
    weeks: [2026-W11]
    load: 50
    state: tentative
",
        "",
    );
    write_record(
        &planning.join("people/bob.md"),
        "alias: bob
role_id: Dev
skills: []
allocations:
  - project: Project-X
    weeks: [2026-W11]
    planned_hours: 48
    capacity_hours: 40
",
        "",
    );
    fs::write(planning.join("people/broken.md"), "no front matter here\n").unwrap();
    write_record(
        &planning.join("projects/Project-X.md"),
        "project_id: px-01
name: Project-X
owner_alias: alice
start_week: 2026-W01
end_week: 2026-W20
status: active
team_aliases: [alice, bob]
start_week_override: 2026-W08
hourly_rate: 1200
milestones:
  - title: Go Live
    date: 2026-03-05
",
        "\nInternal tooling rebuild.\nMore detail.\n",
    );
    write_record(
        &planning.join("projects/Project-Y.md"),
        "project_id: py-01
name: Project-Y
owner_alias: alice
start_week: 2026-W05
end_week: 2026-W30
status: planned
team_aliases: [alice]
",
        "Research spike.\n",
    );
    write_record(
        &planning.join("roles/Dev.md"),
        "role_id: Dev\nname: Developer\n",
        "",
    );
    write_record(
        &identity.join("alice.md"),
        "alias: alice\nreal_name: Alice Andersson\nrole: Engineer\n",
        "",
    );
    dir
}

#[test]
fn users_get_one_slot_per_dataset_week() {
    let dir = dataset();
    let dashboard = build_dashboard(
        &dir.path().join("planning"),
        &dir.path().join("identity"),
        true,
    )
    .unwrap();

    let weeks: Vec<String> = dashboard.weeks.iter().map(|w| w.to_string()).collect();
    assert_eq!(weeks, vec!["2026-W10", "2026-W11"]);

    let aliases: Vec<&str> = dashboard.users.iter().map(|u| u.alias.as_str()).collect();
    assert_eq!(aliases, vec!["alice", "bob"]);

    let bob = &dashboard.users[1];
    assert_eq!(bob.weekly_stats.len(), 2);
    assert_eq!(bob.weekly_stats[0].total_load, 0.0);
    assert!(bob.weekly_stats[0].projects.is_empty());
    assert_eq!(bob.weekly_stats[1].total_load, 120.0);
    assert_eq!(bob.weekly_stats[1].total_planned_hours, 48.0);

    let alice = &dashboard.users[0];
    assert_eq!(alice.weekly_stats[0].total_load, 50.0);
    assert_eq!(
        alice.weekly_stats[1].projects[0].state,
        AllocationState::Tentative
    );

    assert_eq!(dashboard.metrics.users_count, 2);
    assert_eq!(dashboard.metrics.overbooked_slots, 1);
    assert_eq!(dashboard.metrics.average_utilization, 55.0);
    assert_eq!(dashboard.raw_allocations.len(), 3);
}

#[test]
fn project_ranges_prefer_overrides_then_allocations_then_declared_weeks() {
    let dir = dataset();
    let dashboard = build_dashboard(
        &dir.path().join("planning"),
        &dir.path().join("identity"),
        true,
    )
    .unwrap();

    let x = &dashboard.projects[0];
    assert_eq!(x.project.name, "Project-X");
    assert_eq!(x.project.summary, "Internal tooling rebuild.");
    assert_eq!(x.project.hourly_rate, Some(1200.0));
    assert_eq!(x.derived_start_week.unwrap().to_string(), "2026-W10");
    assert_eq!(x.derived_end_week.unwrap().to_string(), "2026-W11");
    assert_eq!(x.resolved_start_week.as_deref(), Some("2026-W08"));
    assert_eq!(x.resolved_end_week.as_deref(), Some("2026-W11"));
    assert_eq!(x.timeline[0].week.unwrap().to_string(), "2026-W10");

    let y = &dashboard.projects[1];
    assert_eq!(y.resolved_start_week.as_deref(), Some("2026-W11"));
    assert_eq!(y.resolved_end_week.as_deref(), Some("2026-W11"));
}

#[test]
fn real_names_only_appear_when_requested() {
    let dir = dataset();
    let planning = dir.path().join("planning");
    let identity = dir.path().join("identity");

    let with_pii = build_dashboard(&planning, &identity, true).unwrap();
    assert_eq!(with_pii.users[0].display_name, "Alice Andersson");
    assert_eq!(with_pii.users[0].role, "Engineer");
    assert_eq!(with_pii.users[1].display_name, "bob");
    assert_eq!(with_pii.users[1].role, "Developer");

    let without_pii = build_dashboard(&planning, &identity, false).unwrap();
    assert_eq!(without_pii.users[0].real_name, None);
    assert_eq!(without_pii.users[0].display_name, "alice");
    let json = serde_json::to_string(&without_pii).unwrap();
    assert!(!json.contains("Andersson"));
}

#[test]
fn dashboard_serializes_flat_project_rows() {
    let dir = dataset();
    let dashboard = build_dashboard(
        &dir.path().join("planning"),
        &dir.path().join("identity"),
        false,
    )
    .unwrap();

    let json = serde_json::to_value(&dashboard).unwrap();
    assert_eq!(json["projects"][0]["name"], "Project-X");
    assert_eq!(json["projects"][0]["resolved_start_week"], "2026-W08");
    assert_eq!(json["users"][0]["weekly_stats"][1]["projects"][0]["state"], "tentative");
    assert_eq!(json["weeks"][0], "2026-W10");
}

#[test]
fn empty_dataset_yields_empty_dashboard() {
    let dir = tempfile::tempdir().unwrap();
    let dashboard = build_dashboard(dir.path(), &dir.path().join("identity"), true).unwrap();
    assert!(dashboard.users.is_empty());
    assert!(dashboard.projects.is_empty());
    assert_eq!(dashboard.metrics.average_utilization, 0.0);
}
