use std::io::Write;

use tracing::{debug, instrument};

use crate::api::TaskApi;
use crate::board::TaskBoard;
use crate::cli::Command;
use crate::render::{BoardView, Renderer, short_id};

const OFFLINE_KEPT: &str = "Offline Mode: change kept locally";

#[instrument(skip(board, renderer, out))]
pub async fn dispatch<A: TaskApi, W: Write>(
    board: &mut TaskBoard<A>,
    renderer: &Renderer,
    out: &mut W,
    command: Command,
) -> anyhow::Result<()> {
    match command {
        Command::List { filter, offline } => {
            if offline {
                debug!("skipping server sync");
            } else {
                board.refresh().await?;
            }
            renderer.print_board(
                out,
                &BoardView {
                    tasks: board.tasks(),
                    filter,
                    online: board.is_online(),
                    error: board.error(),
                },
            )
        }
        Command::Add { description } => {
            let description = description.join(" ");
            match board.add(&description).await? {
                Some(task) => {
                    writeln!(out, "Created task {}.", short_id(&task))?;
                    report_offline(board, out)
                }
                None => {
                    writeln!(out, "Nothing to add: description is empty.")?;
                    Ok(())
                }
            }
        }
        Command::Toggle { id } => {
            let id = board.resolve(&id)?;
            let task = board.toggle(id).await?;
            let state = if task.is_completed { "completed" } else { "active" };
            writeln!(out, "Task {} is now {state}.", short_id(&task))?;
            report_offline(board, out)
        }
        Command::Edit { id, description } => {
            let id = board.resolve(&id)?;
            let task = board.edit(id, &description.join(" ")).await?;
            writeln!(out, "Updated task {}.", short_id(&task))?;
            report_offline(board, out)
        }
        Command::Delete { id } => {
            let id = board.resolve(&id)?;
            let task = board.delete(id).await?;
            writeln!(out, "Deleted task {} '{}'.", short_id(&task), task.description)?;
            report_offline(board, out)
        }
        Command::Stats => renderer.print_stats(out, &board.stats()),
        Command::Status => {
            writeln!(
                out,
                "connection  {}",
                if board.is_online() { "online" } else { "offline" }
            )?;
            writeln!(out, "cache       {}", board.cache_path().display())?;
            writeln!(out, "tasks       {}", board.tasks().len())?;
            if let Some(error) = board.error() {
                writeln!(out, "notice      {error}")?;
            }
            Ok(())
        }
    }
}

fn report_offline<A: TaskApi, W: Write>(board: &TaskBoard<A>, out: &mut W) -> anyhow::Result<()> {
    if !board.is_online() {
        writeln!(out, "{OFFLINE_KEPT}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;
    use std::time::Duration;

    use tempfile::tempdir;

    use super::dispatch;
    use crate::api::HttpTaskApi;
    use crate::board::TaskBoard;
    use crate::cache::LocalCache;
    use crate::cli::Command;
    use crate::render::Renderer;

    /// A port nothing listens on.
    fn closed_port_url() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().expect("addr").port();
        drop(listener);
        format!("http://127.0.0.1:{port}/api")
    }

    #[tokio::test]
    async fn unreachable_server_falls_back_to_cache() {
        let temp = tempdir().expect("tempdir");
        let api = HttpTaskApi::new(&closed_port_url(), Duration::from_secs(2)).expect("client");
        let mut board = TaskBoard::open(api, LocalCache::new(temp.path().join("cache.json")));
        let renderer = Renderer::plain();

        let mut out = Vec::new();
        dispatch(
            &mut board,
            &renderer,
            &mut out,
            Command::Add {
                description: vec!["work".to_string(), "offline".to_string()],
            },
        )
        .await
        .expect("add");
        let text = String::from_utf8(out).expect("utf8");
        assert!(text.contains("Created task"));
        assert!(text.contains("Offline Mode: change kept locally"));

        let mut out = Vec::new();
        dispatch(&mut board, &renderer, &mut out, Command::default())
            .await
            .expect("list");
        let text = String::from_utf8(out).expect("utf8");
        assert!(text.contains("Offline Mode"));
        assert!(text.contains("work offline"));
        assert!(text.contains("Using offline mode"));
    }

    #[tokio::test]
    async fn status_reports_connection_state() {
        let temp = tempdir().expect("tempdir");
        let api = HttpTaskApi::new(&closed_port_url(), Duration::from_secs(2)).expect("client");
        let mut board = TaskBoard::open(api, LocalCache::new(temp.path().join("cache.json")));

        let mut out = Vec::new();
        dispatch(&mut board, &Renderer::plain(), &mut out, Command::Status)
            .await
            .expect("status");
        let text = String::from_utf8(out).expect("utf8");
        assert!(text.contains("connection  online"));
        assert!(text.contains("tasks       0"));
    }
}
