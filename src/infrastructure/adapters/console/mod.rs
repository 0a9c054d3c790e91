//! Console broker for development/testing

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use crate::domain::entities::Event;
use crate::domain::traits::Broker;
use crate::application::errors::BotError;

/// Reads chat lines from stdin and prints replies to stdout.
/// Every line is an event in a single room.
pub struct ConsoleBroker {
    room: String,
    user: String,
}

impl ConsoleBroker {
    pub fn new(room: impl Into<String>) -> Self {
        let user = std::env::var("USER").unwrap_or_else(|_| "console".to_string());
        Self {
            room: room.into(),
            user,
        }
    }
}

impl Default for ConsoleBroker {
    fn default() -> Self {
        Self::new("console")
    }
}

/// Render a table as left-aligned, space-padded columns
pub fn format_table(header: &[String], rows: &[Vec<String>]) -> String {
    let columns = rows.iter().map(Vec::len).chain(std::iter::once(header.len())).max().unwrap_or(0);
    let mut widths = vec![0; columns];
    for row in std::iter::once(header).chain(rows.iter().map(Vec::as_slice)) {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let render = |row: &[String]| {
        row.iter()
            .enumerate()
            .map(|(i, cell)| format!("{:width$}", cell, width = widths[i]))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut out = vec![render(header)];
    out.push(widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>().join("  "));
    out.extend(rows.iter().map(|r| render(r.as_slice())));
    out.join("\n")
}

#[async_trait]
impl Broker for ConsoleBroker {
    fn name(&self) -> &str {
        "console"
    }

    fn send(&self, evt: Event) -> Result<(), BotError> {
        println!("[{}] {}", evt.room, evt.body);
        Ok(())
    }

    fn send_table(&self, evt: Event, header: &[String], rows: &[Vec<String>]) -> Result<(), BotError> {
        println!("[{}]\n{}", evt.room, format_table(header, rows));
        Ok(())
    }

    async fn stream(&self, out: mpsc::Sender<Event>) -> Result<(), BotError> {
        tracing::info!("Starting console broker (dev mode) in room '{}'", self.room);

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| BotError::Broker(format!("stdin: {}", e)))?
        {
            if line.trim().is_empty() {
                continue;
            }
            let evt = Event::new(self.room.clone(), line).with_user(self.user.clone(), self.user.clone());
            if out.send(evt).await.is_err() {
                break;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &[&str]) -> Vec<String> {
        v.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn table_columns_are_aligned() {
        let table = format_table(
            &s(&["plugin", "channel"]),
            &[s(&["echo", "ops"]), s(&["pluginmgr", "console"])],
        );
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "plugin     channel");
        assert_eq!(lines[1], "---------  -------");
        assert_eq!(lines[2], "echo       ops");
        assert_eq!(lines[3], "pluginmgr  console");
    }

    #[test]
    fn table_with_ragged_rows() {
        let table = format_table(&s(&["a"]), &[s(&["x", "yy"])]);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "a");
        assert_eq!(lines[1], "-  --");
        assert_eq!(lines[2], "x  yy");
    }
}
