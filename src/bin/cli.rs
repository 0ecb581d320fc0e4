use std::io::{self, Write};
use std::str::FromStr;

use chrono::NaiveDate;
use cleaning_schedule::{
    NewCleaningTask, RecurrenceFrequency, RecurrenceRequest, RecurrenceSpec, ScheduleError,
    ScheduleOptions, SchedulePlanner, ScheduleReport, SchedulerConfig, library, logging, persistence,
};
use tokio::runtime::Runtime;

fn push_table_row<S: AsRef<str>>(out: &mut String, widths: &[usize], cells: &[S]) {
    out.push('|');
    for (ci, cell) in cells.iter().enumerate() {
        let cell = cell.as_ref();
        out.push(' ');
        out.push_str(cell);
        let pad = widths[ci].saturating_sub(cell.chars().count());
        if pad > 0 {
            out.push_str(&" ".repeat(pad));
        }
        out.push_str(" |");
    }
    out.push('\n');
}

fn render_text_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    // Compute column widths
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (ci, cell) in row.iter().enumerate() {
            let len = cell.chars().count();
            if len > widths[ci] {
                widths[ci] = len;
            }
        }
    }

    let mut sep = String::from("+");
    for w in &widths {
        sep.push_str(&"-".repeat(*w + 2));
        sep.push('+');
    }

    let mut out = String::new();
    out.push_str(&sep);
    out.push('\n');
    push_table_row(&mut out, &widths, headers);
    out.push_str(&sep);
    out.push('\n');
    for row in rows {
        push_table_row(&mut out, &widths, row.as_slice());
    }
    out.push_str(&sep);
    out.push('\n');
    out
}

fn print_help() {
    println!(
        "Commands:\n  help                                          Show this help\n  zones                                         List predefined zones\n  preview <YYYY-MM-DD> <freq> <horizon|count> [n]\n                                                Show generated dates (freq: daily, weekly, monthly, custom:<days>)\n  define <freq> <name...>                       Define a cleaning task\n  schedule <task_id> <YYYY-MM-DD> <horizon|count> [n]\n                                                Schedule occurrences for a task\n  plan <zone> <YYYY-MM-DD> <horizon_days>       Define and schedule a predefined zone\n  list                                          List task definitions\n  list <task_id>                                List occurrences of a task\n  save <json|csv> <task_id> <path>              Export occurrences of a task\n  quit|exit                                     Exit"
    );
}

fn parse_date(input: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(input, "%Y-%m-%d").ok()
}

/// Build a request so the CLI goes through the same clamp and validation as the API.
fn recurrence_spec(
    start_date: NaiveDate,
    frequency: RecurrenceFrequency,
    mode: &str,
    value: i64,
) -> Result<RecurrenceSpec, String> {
    let mut request = match mode {
        "horizon" => RecurrenceRequest::horizon(start_date, frequency.as_str(), value),
        "count" => RecurrenceRequest::count(start_date, frequency.as_str(), value),
        other => return Err(format!("Unknown mode '{other}' (horizon|count)")),
    };
    request.custom_interval_days = frequency.frequency_days().map(i64::from);
    request.into_spec().map_err(|e| format!("Invalid {}: {}", e.field(), e))
}

/// Explicit `n`, or the configured default for the mode.
fn mode_value(config: &SchedulerConfig, mode: &str, n: Option<&str>) -> Result<i64, String> {
    match (n, mode) {
        (Some(raw), _) => raw.parse().map_err(|_| format!("Invalid number '{raw}'")),
        (None, "count") => Ok(i64::from(config.default_occurrence_limit)),
        (None, _) => Ok(i64::from(config.default_horizon_days)),
    }
}

fn format_dates(dates: &[NaiveDate]) -> String {
    dates
        .iter()
        .map(|d| d.format("%Y-%m-%d").to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn report_error(err: ScheduleError) {
    println!("Error: {err}");
    report_followup(&err);
}

fn report_followup(err: &ScheduleError) {
    match err {
        ScheduleError::Write(failure) if failure.definition_created => {
            println!(
                "Task {} was defined but not fully scheduled; retry with 'schedule {} ...'.",
                failure.task_id, failure.task_id
            );
        }
        ScheduleError::Plan {
            completed, failure, ..
        } => {
            if !completed.is_empty() {
                let ids = completed
                    .iter()
                    .map(|report| report.task_id.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                println!("Already planned task(s): {ids}");
            }
            report_followup(failure);
        }
        _ => {}
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_tracing();
    let config = SchedulerConfig::from_env()?;
    let planner: SchedulePlanner = config.planner()?;
    let runtime = Runtime::new()?;

    println!("Cleaning Schedule (CLI) - type 'help' for commands\n");

    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("> ");
        let _ = io::stdout().flush();
        line.clear();
        match stdin.read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        let mut parts = input.split_whitespace();
        let cmd = parts.next().unwrap_or("");

        match cmd {
            "help" => print_help(),
            "quit" | "exit" => break,
            "zones" => {
                let rows: Vec<Vec<String>> = library::zones()
                    .into_iter()
                    .map(|zone| {
                        vec![
                            zone.to_string(),
                            library::tasks_for_zone(zone).len().to_string(),
                        ]
                    })
                    .collect();
                println!("{}", render_text_table(&["zone", "tasks"], &rows));
            }
            "preview" => {
                let args: Vec<&str> = parts.collect();
                let (date_s, freq_s, mode, n_s) = match args.as_slice() {
                    [d, f, m] => (*d, *f, *m, None),
                    [d, f, m, n] => (*d, *f, *m, Some(*n)),
                    _ => {
                        println!("Usage: preview <YYYY-MM-DD> <freq> <horizon|count> [n]");
                        continue;
                    }
                };
                let Some(start) = parse_date(date_s) else {
                    println!("Invalid date (YYYY-MM-DD)");
                    continue;
                };
                let frequency = match RecurrenceFrequency::from_str(freq_s) {
                    Ok(f) => f,
                    Err(e) => {
                        println!("Invalid frequency: {e}");
                        continue;
                    }
                };
                let n = match mode_value(&config, mode, n_s) {
                    Ok(n) => n,
                    Err(message) => {
                        println!("{message}");
                        continue;
                    }
                };
                match recurrence_spec(start, frequency, mode, n)
                    .and_then(|spec| planner.preview(&spec).map_err(|e| e.to_string()))
                {
                    Ok(dates) => println!("{} date(s): {}", dates.len(), format_dates(&dates)),
                    Err(e) => println!("{e}"),
                }
            }
            "define" => {
                let freq_s = parts.next();
                let name = parts.collect::<Vec<_>>().join(" ");
                let Some(freq_s) = freq_s.filter(|_| !name.is_empty()) else {
                    println!("Usage: define <freq> <name...>");
                    continue;
                };
                let frequency = match RecurrenceFrequency::from_str(freq_s) {
                    Ok(f) => f,
                    Err(e) => {
                        println!("Invalid frequency: {e}");
                        continue;
                    }
                };
                let task = NewCleaningTask::new(name, frequency);
                match runtime.block_on(planner.define_task(task)) {
                    Ok(def) => println!("Defined task {}: {} ({})", def.id, def.name, def.frequency),
                    Err(e) => report_error(e),
                }
            }
            "schedule" => {
                let args: Vec<&str> = parts.collect();
                let (id_s, date_s, mode, n_s) = match args.as_slice() {
                    [i, d, m] => (*i, *d, *m, None),
                    [i, d, m, n] => (*i, *d, *m, Some(*n)),
                    _ => {
                        println!("Usage: schedule <task_id> <YYYY-MM-DD> <horizon|count> [n]");
                        continue;
                    }
                };
                let Ok(task_id) = id_s.parse::<i64>() else {
                    println!("Invalid task id");
                    continue;
                };
                let Some(start) = parse_date(date_s) else {
                    println!("Invalid date (YYYY-MM-DD)");
                    continue;
                };
                let n = match mode_value(&config, mode, n_s) {
                    Ok(n) => n,
                    Err(message) => {
                        println!("{message}");
                        continue;
                    }
                };
                let result: Result<Result<ScheduleReport, String>, ScheduleError> =
                    runtime.block_on(async {
                        let task = planner.task(task_id).await?;
                        let spec = match recurrence_spec(start, task.frequency, mode, n) {
                            Ok(spec) => spec,
                            Err(message) => return Ok(Err(message)),
                        };
                        planner
                            .schedule_task(task_id, &spec, &ScheduleOptions::default())
                            .await
                            .map(Ok)
                    });
                match result {
                    Ok(Ok(report)) => println!(
                        "Scheduled {} occurrence(s) for task {} ({} already present).",
                        report.outcome.committed, report.task_id, report.outcome.duplicates
                    ),
                    Ok(Err(message)) => println!("{message}"),
                    Err(e) => report_error(e),
                }
            }
            "plan" => {
                let args: Vec<&str> = parts.collect();
                let [zone, date_s, n_s] = args.as_slice() else {
                    println!("Usage: plan <zone> <YYYY-MM-DD> <horizon_days>");
                    continue;
                };
                let Some(start) = parse_date(date_s) else {
                    println!("Invalid date (YYYY-MM-DD)");
                    continue;
                };
                let Ok(horizon_days) = n_s.parse::<u32>() else {
                    println!("Invalid horizon_days");
                    continue;
                };
                match runtime.block_on(planner.plan_zone(
                    zone,
                    start,
                    horizon_days,
                    &ScheduleOptions::default(),
                )) {
                    Ok(plan) => {
                        println!(
                            "Planned zone {}: {} task(s), {} occurrence(s).",
                            plan.zone,
                            plan.tasks.len(),
                            plan.occurrence_count()
                        );
                    }
                    Err(e) => report_error(e),
                }
            }
            "list" => match parts.next() {
                None => match runtime.block_on(planner.tasks()) {
                    Ok(tasks) => {
                        let rows: Vec<Vec<String>> = tasks
                            .iter()
                            .map(|t| {
                                vec![
                                    t.id.to_string(),
                                    t.name.clone(),
                                    t.frequency.to_string(),
                                    t.details.zone_id.clone().unwrap_or_default(),
                                ]
                            })
                            .collect();
                        println!(
                            "{}",
                            render_text_table(&["id", "name", "frequency", "zone"], &rows)
                        );
                    }
                    Err(e) => report_error(e),
                },
                Some(id_s) => {
                    let Ok(task_id) = id_s.parse::<i64>() else {
                        println!("Invalid task id");
                        continue;
                    };
                    match runtime.block_on(planner.occurrences(task_id)) {
                        Ok(occurrences) => {
                            let rows: Vec<Vec<String>> = occurrences
                                .iter()
                                .map(|o| {
                                    vec![
                                        o.scheduled_date.format("%Y-%m-%d").to_string(),
                                        o.is_completed.to_string(),
                                        o.is_compliant.map(|c| c.to_string()).unwrap_or_default(),
                                    ]
                                })
                                .collect();
                            println!(
                                "{}",
                                render_text_table(
                                    &["scheduled_date", "completed", "compliant"],
                                    &rows
                                )
                            );
                        }
                        Err(e) => report_error(e),
                    }
                }
            },
            "save" => {
                let args: Vec<&str> = parts.collect();
                let [format, id_s, path] = args.as_slice() else {
                    println!("Usage: save <json|csv> <task_id> <path>");
                    continue;
                };
                let Ok(task_id) = id_s.parse::<i64>() else {
                    println!("Invalid task id");
                    continue;
                };
                let occurrences = match runtime.block_on(planner.occurrences(task_id)) {
                    Ok(o) => o,
                    Err(e) => {
                        report_error(e);
                        continue;
                    }
                };
                let result = match *format {
                    "json" => persistence::save_occurrences_to_json(&occurrences, path),
                    "csv" => persistence::save_occurrences_to_csv(&occurrences, path),
                    _ => {
                        println!("Usage: save <json|csv> <task_id> <path>");
                        continue;
                    }
                };
                match result {
                    Ok(()) => println!("Saved {} occurrence(s) to {}", occurrences.len(), path),
                    Err(e) => println!("Error: {e}"),
                }
            }
            _ => println!("Unknown command. Type 'help'."),
        }
    }
    Ok(())
}
