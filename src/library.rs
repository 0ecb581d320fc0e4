//! Built-in cleaning plan templates, grouped by zone and category.

use crate::recurrence::{EventTrigger, RecurrenceFrequency};
use crate::task::NewCleaningTask;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PredefinedTask {
    pub zone: &'static str,
    pub category: &'static str,
    pub name: &'static str,
    pub frequency: RecurrenceFrequency,
}

impl PredefinedTask {
    pub fn to_new_task(&self) -> NewCleaningTask {
        NewCleaningTask::new(self.name, self.frequency)
            .with_action(format!("Tâche {} - {}", self.name, self.category))
            .in_zone(self.zone)
    }
}

const AFTER_USE: RecurrenceFrequency = RecurrenceFrequency::EventTriggered(EventTrigger::AfterEachUse);
const AFTER_SERVICE: RecurrenceFrequency =
    RecurrenceFrequency::EventTriggered(EventTrigger::AfterEachService);
const DAILY: RecurrenceFrequency = RecurrenceFrequency::Daily;
const WEEKLY: RecurrenceFrequency = RecurrenceFrequency::Weekly;
const MONTHLY: RecurrenceFrequency = RecurrenceFrequency::Monthly;

const fn task(
    zone: &'static str,
    category: &'static str,
    name: &'static str,
    frequency: RecurrenceFrequency,
) -> PredefinedTask {
    PredefinedTask {
        zone,
        category,
        name,
        frequency,
    }
}

static PREDEFINED_TASKS: &[PredefinedTask] = &[
    task("CUISINE", "APRÈS CHAQUE UTILISATION", "Nettoyage des friteuses", AFTER_USE),
    task("CUISINE", "APRÈS CHAQUE UTILISATION", "Essuyage des surfaces (Essa)", AFTER_USE),
    task("CUISINE", "QUOTIDIEN", "Sols, plinthes, grilles et siphons", DAILY),
    task("CUISINE", "QUOTIDIEN", "Désinfection des poignées de portes et interrupteurs", DAILY),
    task("CUISINE", "QUOTIDIEN", "Nettoyage des ustensiles, planches et couteaux", DAILY),
    task("CUISINE", "QUOTIDIEN", "Désinfection des plans de travail", DAILY),
    task("CUISINE", "QUOTIDIEN", "Nettoyage du passe-plat", DAILY),
    task("CUISINE", "HEBDOMADAIRE", "Nettoyage des échelles", WEEKLY),
    task("CUISINE", "HEBDOMADAIRE", "Détartrage des hottes et remplacement des filtres", WEEKLY),
    task("CUISINE", "HEBDOMADAIRE", "Nettoyage de la cellule de refroidissement", WEEKLY),
    task("CUISINE", "MENSUEL", "Nettoyage des murs et portes", MONTHLY),
    task("CUISINE", "MENSUEL", "Désinfection des tiroirs et étagères", MONTHLY),
    task("CUISINE", "MENSUEL", "Nettoyage de l'armoire froide", MONTHLY),
    task("ECONOMAT", "APRÈS CHAQUE SERVICE", "Nettoyage des sols, plinthes, grilles et siphons", AFTER_SERVICE),
    task("ECONOMAT", "HEBDOMADAIRE", "Nettoyage des étagères et clayettes", WEEKLY),
    task("ECONOMAT", "HEBDOMADAIRE", "Désinfection des chambres froides", WEEKLY),
    task("ECONOMAT", "MENSUEL", "Nettoyage des murs et portes", MONTHLY),
];

/// Zone names in library order.
pub fn zones() -> Vec<&'static str> {
    let mut zones: Vec<&'static str> = Vec::new();
    for task in PREDEFINED_TASKS {
        if !zones.contains(&task.zone) {
            zones.push(task.zone);
        }
    }
    zones
}

/// Predefined tasks for a zone, matched case-insensitively.
pub fn tasks_for_zone(zone: &str) -> Vec<PredefinedTask> {
    PREDEFINED_TASKS
        .iter()
        .filter(|task| task.zone.eq_ignore_ascii_case(zone.trim()))
        .copied()
        .collect()
}
