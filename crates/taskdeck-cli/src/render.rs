use std::io::{self, IsTerminal, Write};

use chrono::Local;
use taskdeck_core::config::Config;
use taskdeck_shared::{Task, TaskFilter, TaskStats};
use unicode_width::UnicodeWidthStr;

const SHORT_ID_LEN: usize = 8;

/// What one screen of the board shows.
pub struct BoardView<'a> {
    pub tasks: &'a [Task],
    pub filter: TaskFilter,
    pub online: bool,
    pub error: Option<&'a str>,
}

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> Self {
        let color = cfg.get_bool("color").unwrap_or(true);
        Self {
            color: color && io::stdout().is_terminal(),
        }
    }

    pub fn plain() -> Self {
        Self { color: false }
    }

    #[tracing::instrument(skip_all, fields(filter = %view.filter, count = view.tasks.len()))]
    pub fn print_board<W: Write>(&self, out: &mut W, view: &BoardView<'_>) -> anyhow::Result<()> {
        let stats = TaskStats::from_tasks(view.tasks);

        if !view.online {
            writeln!(out, "{}", self.paint("● Offline Mode", "33"))?;
        }

        let tabs = TaskFilter::VARIANTS
            .iter()
            .map(|filter| {
                let label = format!("{} {}", capitalize(filter.as_str()), filter.count(&stats));
                if *filter == view.filter {
                    self.paint(&format!("[{label}]"), "1;34")
                } else {
                    format!(" {label} ")
                }
            })
            .collect::<Vec<_>>()
            .join("  ");
        writeln!(out, "{tabs}")?;
        writeln!(out)?;

        let visible = view.filter.apply(view.tasks);
        if visible.is_empty() {
            writeln!(out, "No tasks found")?;
            if view.filter == TaskFilter::All {
                writeln!(out, "Add your first task to get started!")?;
            } else {
                writeln!(out, "No {} tasks at the moment.", view.filter)?;
            }
        } else {
            self.write_task_table(&mut *out, &visible)?;
        }

        if !view.tasks.is_empty() {
            writeln!(out)?;
            writeln!(
                out,
                "{} {} remaining",
                stats.active,
                if stats.active == 1 { "task" } else { "tasks" }
            )?;
        }

        if let Some(error) = view.error {
            writeln!(out, "{}", self.paint(error, "33"))?;
        }

        Ok(())
    }

    pub fn print_stats<W: Write>(&self, out: &mut W, stats: &TaskStats) -> anyhow::Result<()> {
        writeln!(out, "Total Tasks  {}", self.paint(&stats.total.to_string(), "35"))?;
        writeln!(out, "Active       {}", self.paint(&stats.active.to_string(), "34"))?;
        writeln!(out, "Completed    {}", self.paint(&stats.completed.to_string(), "32"))?;
        Ok(())
    }

    fn write_task_table<W: Write>(&self, out: W, tasks: &[&Task]) -> anyhow::Result<()> {
        let headers = vec![
            "ID".to_string(),
            "Done".to_string(),
            "Created".to_string(),
            "Description".to_string(),
        ];

        let rows = tasks
            .iter()
            .map(|task| {
                let id = self.paint(&short_id(task), "33");
                let done = if task.is_completed {
                    self.paint("[x]", "32")
                } else {
                    "[ ]".to_string()
                };
                let created = task
                    .created_at
                    .with_timezone(&Local)
                    .format("%b %-d, %Y, %I:%M %p")
                    .to_string();
                let description = if task.is_completed {
                    self.paint(&task.description, "9;2")
                } else {
                    task.description.clone()
                };
                vec![id, done, created, description]
            })
            .collect();

        write_table(out, headers, rows)
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

pub fn short_id(task: &Task) -> String {
    task.id.to_string().chars().take(SHORT_ID_LEN).collect()
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for idx in 0..column_count {
        write!(writer, "{:width$} ", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    for width in &widths {
        write!(writer, "{:-<width$} ", "", width = *width)?;
    }
    writeln!(writer)?;

    for row in rows {
        for (idx, cell) in row.iter().enumerate() {
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use taskdeck_core::config::Config;
    use taskdeck_shared::{Task, TaskFilter, TaskStats};

    use super::{BoardView, Renderer, short_id, strip_ansi};

    fn render(view: &BoardView<'_>) -> String {
        let mut out = Vec::new();
        Renderer::plain().print_board(&mut out, view).expect("render");
        String::from_utf8(out).expect("utf8")
    }

    fn sample() -> Vec<Task> {
        let open = Task::new("Buy bread".to_string(), Utc::now());
        let mut done = Task::new("Pay rent".to_string(), Utc::now());
        done.is_completed = true;
        vec![open, done]
    }

    #[test]
    fn board_shows_tabs_rows_and_remaining_count() {
        let tasks = sample();
        let text = render(&BoardView {
            tasks: &tasks,
            filter: TaskFilter::All,
            online: true,
            error: None,
        });

        assert!(text.contains("[All 2]"));
        assert!(text.contains(" Active 1 "));
        assert!(text.contains(" Completed 1 "));
        assert!(text.contains("Buy bread"));
        assert!(text.contains("[x]"));
        assert!(text.contains(&short_id(&tasks[1])));
        assert!(text.contains("1 task remaining"));
        assert!(!text.contains("Offline Mode"));
    }

    #[test]
    fn filter_hides_other_group() {
        let tasks = sample();
        let text = render(&BoardView {
            tasks: &tasks,
            filter: TaskFilter::Completed,
            online: true,
            error: None,
        });

        assert!(text.contains("Pay rent"));
        assert!(!text.contains("Buy bread"));
    }

    #[test]
    fn empty_states_and_offline_notice() {
        let text = render(&BoardView {
            tasks: &[],
            filter: TaskFilter::All,
            online: false,
            error: Some("Using offline mode"),
        });
        assert!(text.contains("Offline Mode"));
        assert!(text.contains("Add your first task to get started!"));
        assert!(text.contains("Using offline mode"));
        assert!(!text.contains("remaining"));

        let mut tasks = sample();
        tasks.retain(|task| !task.is_completed);
        let text = render(&BoardView {
            tasks: &tasks,
            filter: TaskFilter::Completed,
            online: true,
            error: None,
        });
        assert!(text.contains("No completed tasks at the moment."));
        assert!(text.contains("1 task remaining"));
    }

    #[test]
    fn plural_remaining_and_stats_block() {
        let tasks = vec![
            Task::new("a".to_string(), Utc::now()),
            Task::new("b".to_string(), Utc::now()),
        ];
        let text = render(&BoardView {
            tasks: &tasks,
            filter: TaskFilter::Active,
            online: true,
            error: None,
        });
        assert!(text.contains("2 tasks remaining"));

        let mut out = Vec::new();
        Renderer::plain()
            .print_stats(&mut out, &TaskStats::from_tasks(&tasks))
            .expect("stats");
        let text = String::from_utf8(out).expect("utf8");
        assert!(text.contains("Total Tasks  2"));
        assert!(text.contains("Completed    0"));
    }

    #[test]
    fn color_off_in_config_disables_escapes() {
        let mut cfg = Config::default();
        cfg.apply_overrides([("color".to_string(), "off".to_string())]);
        let renderer = Renderer::new(&cfg);

        let tasks = sample();
        let mut out = Vec::new();
        renderer
            .print_board(
                &mut out,
                &BoardView {
                    tasks: &tasks,
                    filter: TaskFilter::All,
                    online: false,
                    error: None,
                },
            )
            .expect("render");
        assert!(!String::from_utf8(out).expect("utf8").contains('\x1b'));
    }

    #[test]
    fn strip_ansi_removes_escape_sequences() {
        assert_eq!(strip_ansi("\x1b[33mabc\x1b[0m"), "abc");
    }
}
