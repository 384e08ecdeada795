use roster_core::validation::{contains_email, contains_phone};
use roster_core::{validate_dataset, ValidationError, ValidationReport};
use std::fs;
use std::path::Path;

const ALICE: &str = "alias: alice
role_id: Dev
skills: [Rust, rs]
allocations:
  - project: Project-X
    weeks: [2026-W10]
    planned_hours: 20
    capacity_hours: 40
    load: 50
";

const PROJECT_X: &str = "project_id: px-01
name: Project-X
owner_alias: alice
start_week: 2026-W01
end_week: 2026-W20
status: active
team_aliases: [alice]
milestones:
  - title: Go Live
    date: 2026-03-05
";

fn write_record(path: &Path, front_matter: &str, body: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, format!("---\n{front_matter}---\n{body}")).unwrap();
}

struct Dataset {
    dir: tempfile::TempDir,
}

impl Dataset {
    fn new() -> Self {
        let dataset = Self {
            dir: tempfile::tempdir().unwrap(),
        };
        dataset.person("alice", ALICE);
        dataset.project("Project-X", PROJECT_X, "Internal tooling rebuild.\n");
        write_record(
            &dataset.planning().join("roles/Dev.md"),
            "role_id: Dev\nname: Developer\n",
            "",
        );
        write_record(
            &dataset.planning().join("skills.md"),
            "canonical_skills: [Rust, Python]\nsynonyms:\n  rs: rust\n",
            "",
        );
        write_record(
            &dataset.identity().join("alice.md"),
            "alias: alice\nreal_name: Alice Andersson\nrole: Engineer\n",
            "",
        );
        dataset
    }

    fn planning(&self) -> std::path::PathBuf {
        self.dir.path().join("planning")
    }

    fn identity(&self) -> std::path::PathBuf {
        self.dir.path().join("identity")
    }

    fn person(&self, alias: &str, front_matter: &str) {
        write_record(
            &self.planning().join("people").join(format!("{alias}.md")),
            front_matter,
            "",
        );
    }

    fn project(&self, name: &str, front_matter: &str, body: &str) {
        write_record(
            &self.planning().join("projects").join(format!("{name}.md")),
            front_matter,
            body,
        );
    }

    fn validate(&self) -> ValidationReport {
        validate_dataset(&self.planning(), &self.identity()).unwrap()
    }
}

#[test]
fn consistent_dataset_has_no_findings() {
    let dataset = Dataset::new();
    let report = dataset.validate();

    assert_eq!(report.errors, Vec::<String>::new());
    assert_eq!(report.warnings, Vec::<String>::new());
    assert!(report.is_ok());
    assert_eq!(report.counts.people_files, 1);
    assert_eq!(report.counts.project_files, 1);
    assert_eq!(report.counts.role_files, 1);
    assert_eq!(report.counts.identity_files, 1);
}

#[test]
fn hours_above_capacity_are_one_over_allocation_error() {
    let dataset = Dataset::new();
    dataset.person(
        "alice",
        "alias: alice
role_id: Dev
skills: [Rust]
allocations:
  - project: Project-X
    weeks: [2026-W10]
    planned_hours: 30
    capacity_hours: 40
  - project: Project-X
    weeks: [2026-W10, 2026-W11]
    planned_hours: 20
    capacity_hours: 40
",
    );

    let report = dataset.validate();
    assert_eq!(report.errors.len(), 1, "{:?}", report.errors);
    let error = &report.errors[0];
    assert!(error.contains("over-allocation"));
    assert!(error.contains("2026-W10"));
    assert!(error.contains("50.0 planned hours"));
    assert!(error.contains("capacity 40.0"));
    assert!(error.contains("125.0%"));
}

#[test]
fn hours_exactly_at_capacity_are_accepted() {
    let dataset = Dataset::new();
    dataset.person(
        "alice",
        "alias: alice
role_id: Dev
skills: [Rust]
allocations:
  - project: Project-X
    weeks: [2026-W10]
    load: 60
  - project: Project-X
    weeks: [2026-W10]
    planned_hours: 16
",
    );

    assert!(dataset.validate().is_ok());
}

#[test]
fn conflicting_capacities_in_one_week_are_reported() {
    let dataset = Dataset::new();
    dataset.person(
        "alice",
        "alias: alice
role_id: Dev
skills: [Rust]
allocations:
  - project: Project-X
    weeks: [2026-W10]
    planned_hours: 10
    capacity_hours: 40
  - project: Project-X
    weeks: [2026-W10]
    planned_hours: 10
    capacity_hours: 32
",
    );

    let report = dataset.validate();
    assert_eq!(report.errors.len(), 1, "{:?}", report.errors);
    assert!(report.errors[0].contains("conflicting capacity_hours"));
}

#[test]
fn missing_required_field_is_reported_once() {
    let dataset = Dataset::new();
    dataset.project(
        "Project-X",
        "project_id: px-01
name: Project-X
start_week: 2026-W01
end_week: 2026-W20
status: active
team_aliases: [alice]
",
        "Internal tooling rebuild.\n",
    );

    let report = dataset.validate();
    assert_eq!(report.errors.len(), 1, "{:?}", report.errors);
    assert!(report.errors[0].contains("missing required"));
    assert!(report.errors[0].contains("owner_alias"));
}

#[test]
fn dangling_owner_alias_is_reported_until_fixed() {
    let dataset = Dataset::new();
    dataset.project(
        "Project-X",
        &PROJECT_X.replace("owner_alias: alice", "owner_alias: ghost"),
        "Internal tooling rebuild.\n",
    );

    let report = dataset.validate();
    assert_eq!(report.errors.len(), 1, "{:?}", report.errors);
    assert!(report.errors[0].contains("'ghost'"));

    dataset.project("Project-X", PROJECT_X, "Internal tooling rebuild.\n");
    assert!(dataset.validate().is_ok());
}

#[test]
fn unknown_project_and_role_are_errors_but_unknown_skill_is_a_warning() {
    let dataset = Dataset::new();
    dataset.person(
        "alice",
        &ALICE
            .replace("role_id: Dev", "role_id: Wizard")
            .replace("skills: [Rust, rs]", "skills: [Rust, Cobol]")
            .replace("project: Project-X", "project: Project-Q"),
    );

    let report = dataset.validate();
    assert_eq!(report.errors.len(), 2, "{:?}", report.errors);
    assert!(report.errors.iter().any(|e| e.contains("Project-Q")));
    assert!(report.errors.iter().any(|e| e.contains("Wizard")));
    assert_eq!(report.warnings.len(), 1, "{:?}", report.warnings);
    assert!(report.warnings[0].contains("Cobol"));
}

#[test]
fn malformed_allocation_entries_are_schema_errors() {
    let dataset = Dataset::new();
    dataset.person(
        "alice",
        "alias: alice
role_id: Dev
skills: [Rust]
allocations:
  - project: Project-X
    weeks: [2026-W60]
    load: 10
  - project: Project-X
    weeks: [2026-W12]
    load: 90
    planned_hours: 20
  - project: Project-X
    weeks: [2026-W13]
    state: maybe
    load: 10
  - project: Project-X
    weeks: [2026-W14]
",
    );

    let report = dataset.validate();
    assert_eq!(report.errors.len(), 4, "{:?}", report.errors);
    assert!(report.errors[0].contains("invalid ISO week '2026-W60'"));
    assert!(report.errors[1].contains("disagrees"));
    assert!(report.errors[2].contains("'state'"));
    assert!(report.errors[3].contains("'load' or 'planned_hours'"));
}

#[test]
fn alias_must_match_file_name() {
    let dataset = Dataset::new();
    dataset.person("alice", &ALICE.replace("alias: alice", "alias: alicia"));

    let report = dataset.validate();
    assert!(report
        .errors
        .iter()
        .any(|e| e.contains("filename stem must match alias")));
}

#[test]
fn leaked_identity_data_is_reported_without_repeating_the_name() {
    let dataset = Dataset::new();
    dataset.project(
        "Project-X",
        PROJECT_X,
        "Ask ALICE ANDERSSON, alice@example.com or +46 70 123 45 67.\n",
    );

    let report = dataset.validate();
    assert_eq!(report.errors.len(), 3, "{:?}", report.errors);
    assert!(report.errors.iter().all(|e| e.contains("potential PII leak")));
    assert!(report.errors.iter().any(|e| e.contains("identity 'alice'")));
    assert!(report.errors.iter().any(|e| e.contains("email-like")));
    assert!(report.errors.iter().any(|e| e.contains("phone-like")));
    assert!(!report.errors.iter().any(|e| e.to_lowercase().contains("andersson")));
}

#[test]
fn optional_catalogs_missing_are_warnings() {
    let dataset = Dataset::new();
    fs::remove_dir_all(dataset.planning().join("roles")).unwrap();
    fs::remove_file(dataset.planning().join("skills.md")).unwrap();
    fs::remove_dir_all(dataset.identity()).unwrap();

    let report = dataset.validate();
    assert!(report.is_ok(), "{:?}", report.errors);
    assert_eq!(report.warnings.len(), 3, "{:?}", report.warnings);
    assert_eq!(report.counts.identity_files, 0);
}

#[test]
fn synonym_to_unknown_skill_is_a_warning() {
    let dataset = Dataset::new();
    write_record(
        &dataset.planning().join("skills.md"),
        "canonical_skills: [Rust]\nsynonyms:\n  rs: rust\n  py: python\n",
        "",
    );

    let report = dataset.validate();
    assert!(report.is_ok(), "{:?}", report.errors);
    assert!(report.warnings.iter().any(|w| w.contains("'python'")));
}

#[test]
fn missing_required_directories_abort_validation() {
    let dir = tempfile::tempdir().unwrap();
    match validate_dataset(dir.path(), &dir.path().join("identity")) {
        Err(ValidationError::MissingDirectories(paths)) => assert_eq!(paths.len(), 2),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn pii_patterns() {
    assert!(contains_email("My email is erik.a@company.se."));
    assert!(!contains_email("not an email"));
    assert!(contains_phone("+1 (555) 010-9999"));
    assert!(!contains_phone("date: 2026-04-30"));
}
