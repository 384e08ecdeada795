//! Cross-reference pass.
//!
//! Unknown projects, aliases and roles are errors. Unknown skills are
//! warnings. Each distinct dangling reference is reported once per record.

use super::schema::DatasetFacts;
use super::ValidationReport;
use std::collections::BTreeSet;

pub(super) fn check(facts: &DatasetFacts, report: &mut ValidationReport) {
    for person in &facts.people {
        let alias = person.alias.as_str();

        let unknown_projects: BTreeSet<&str> = person
            .entries
            .iter()
            .filter_map(|entry| entry.project.as_deref())
            .filter(|project| !facts.known_projects.contains(*project))
            .collect();
        for project in unknown_projects {
            report.errors.push(format!(
                "alias '{alias}': allocation references unknown project '{project}'"
            ));
        }

        if let (Some(known_roles), Some(role_id)) = (&facts.known_roles, &person.role_id) {
            if !known_roles.contains(role_id) {
                report
                    .errors
                    .push(format!("alias '{alias}': unknown role_id '{role_id}'"));
            }
        }

        if let Some(catalog) = &facts.skills_catalog {
            let unknown_skills: BTreeSet<&str> = person
                .skills
                .iter()
                .map(String::as_str)
                .filter(|skill| !catalog.is_known(skill))
                .collect();
            for skill in unknown_skills {
                report.warnings.push(format!(
                    "alias '{alias}': skill '{skill}' is not in the skills catalog"
                ));
            }
        }
    }

    for project in &facts.projects {
        let mut referenced: BTreeSet<&str> = project
            .team_aliases
            .iter()
            .map(String::as_str)
            .collect();
        if let Some(owner) = project.owner_alias.as_deref() {
            if !facts.known_aliases.contains(owner) {
                report.errors.push(format!(
                    "project '{}': owner_alias '{owner}' has no person record",
                    project.name
                ));
            }
            referenced.remove(owner);
        }
        for alias in referenced {
            if !facts.known_aliases.contains(alias) {
                report.errors.push(format!(
                    "project '{}': team alias '{alias}' has no person record",
                    project.name
                ));
            }
        }
    }
}
