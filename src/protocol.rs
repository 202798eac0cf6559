//! The pass_persist request loop.
//!
//! snmpd writes one command per line and blocks until the reply is
//! complete, so the loop is strictly sequential: read, dispatch, write,
//! flush, repeat. An empty command line or a closed stream is the terminal
//! state: the loop returns normally and the process exits; snmpd restarts
//! the agent on its next query.

use crate::error::{Error, Result};
use crate::oid::Oid;
use crate::snapshot::{Snapshot, TYPE_INTEGER};
use std::io::{BufRead, Write};

const PING: &str = "PING";
const PONG: &str = "PONG";
const GET: &str = "get";
const GETNEXT: &str = "getnext";
const SET: &str = "set";
/// Reply for a missing object; snmpd maps it to noSuchName.
const NONE_REPLY: &str = "NONE";
/// Reply for any `set`; nothing this agent serves is writable.
const NOT_WRITABLE: &str = "not-writable";

pub struct ProtocolHandler<'a> {
    snapshot: &'a Snapshot,
}

impl<'a> ProtocolHandler<'a> {
    pub fn new(snapshot: &'a Snapshot) -> Self {
        Self { snapshot }
    }

    /// Runs the request loop until the terminal state.
    ///
    /// Only write/flush failures return an error: a malformed command or
    /// OID is the caller's framing bug, logged and answered (or skipped)
    /// without ending the session.
    pub fn serve<R: BufRead, W: Write>(&self, mut reader: R, mut writer: W) -> Result<()> {
        loop {
            let Some(line) = read_line(&mut reader)? else {
                return Ok(());
            };
            let command = line.trim();
            if command.is_empty() {
                return Ok(());
            }

            match command {
                PING => {
                    writeln!(writer, "{}", PONG)?;
                }
                GET => {
                    let Some(argument) = read_line(&mut reader)? else {
                        return Ok(());
                    };
                    self.reply_get(&mut writer, &argument)?;
                }
                GETNEXT => {
                    let Some(argument) = read_line(&mut reader)? else {
                        return Ok(());
                    };
                    self.reply_getnext(&mut writer, &argument)?;
                }
                SET => {
                    // Two argument lines: the OID, then "<type> <value>".
                    // Consume both to stay in frame, then refuse.
                    for _ in 0..2 {
                        if read_line(&mut reader)?.is_none() {
                            return Ok(());
                        }
                    }
                    writeln!(writer, "{}", NOT_WRITABLE)?;
                }
                other => {
                    tracing::warn!(command = other, "unrecognized command, ignoring");
                    continue;
                }
            }
            writer.flush()?;
        }
    }

    fn reply_get<W: Write>(&self, writer: &mut W, argument: &str) -> Result<()> {
        match argument.trim().parse::<Oid>() {
            Ok(oid) => match self.snapshot.get(&oid) {
                Some(record) => {
                    writeln!(writer, "{}", record.oid)?;
                    writeln!(writer, "{}", TYPE_INTEGER)?;
                    writeln!(writer, "{}", record.status)?;
                }
                None => {
                    writeln!(writer, "{}", NONE_REPLY)?;
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "malformed OID in get");
                writeln!(writer, "{}", NONE_REPLY)?;
            }
        }
        Ok(())
    }

    fn reply_getnext<W: Write>(&self, writer: &mut W, argument: &str) -> Result<()> {
        let oid = match argument.trim().parse::<Oid>() {
            Ok(oid) => oid,
            Err(e) => {
                tracing::warn!(error = %e, "malformed OID in getnext");
                writeln!(writer, "{}", NONE_REPLY)?;
                return Ok(());
            }
        };

        match self.snapshot.next_after(&oid) {
            Ok(Some(record)) => {
                writeln!(writer, "{}", record.oid.prefixed())?;
                writeln!(writer, "{}", TYPE_INTEGER)?;
                writeln!(writer, "{}", record.status)?;
            }
            Ok(None) => {
                // End of walk. The walker restarts from the prefix.
                writeln!(writer, "{}", NONE_REPLY)?;
            }
            Err(Error::NotFound(oid)) => {
                tracing::warn!(oid = %oid, "getnext from an OID not in the snapshot");
                writeln!(writer, "{}", NONE_REPLY)?;
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }
}

/// One line from the peer; `None` on a closed stream.
fn read_line<R: BufRead>(reader: &mut R) -> Result<Option<String>> {
    let mut line = String::new();
    let bytes = reader.read_line(&mut line)?;
    if bytes == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oid::Oid;
    use crate::snapshot::Record;
    use std::io::Cursor;

    fn prefix() -> Oid {
        "1.3.9950.1".parse().unwrap()
    }

    fn snapshot() -> Snapshot {
        Snapshot::from_records(
            [("cron", 0), ("sshd", 0), ("nginx", 3)]
                .into_iter()
                .map(|(name, status)| Record {
                    oid: prefix().encode_name(name),
                    name: name.to_string(),
                    status,
                })
                .collect(),
        )
    }

    fn run(input: &str) -> Vec<String> {
        let snapshot = snapshot();
        let handler = ProtocolHandler::new(&snapshot);
        let mut output = Vec::new();
        handler.serve(Cursor::new(input), &mut output).unwrap();
        String::from_utf8(output)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn ping_pong() {
        assert_eq!(run("PING\n"), ["PONG"]);
    }

    #[test]
    fn get_hit_answers_three_lines() {
        let sshd = prefix().encode_name("sshd");
        let input = format!("get\n{}\n", sshd);
        assert_eq!(run(&input), [sshd.to_string(), "integer".into(), "0".into()]);
    }

    #[test]
    fn get_accepts_leading_dot_form() {
        let nginx = prefix().encode_name("nginx");
        let input = format!("get\n{}\n", nginx.prefixed());
        assert_eq!(
            run(&input),
            [nginx.to_string(), "integer".into(), "3".into()]
        );
    }

    #[test]
    fn get_miss_answers_none() {
        let input = format!("get\n{}\n", prefix().encode_name("dbus"));
        assert_eq!(run(&input), ["NONE"]);
    }

    #[test]
    fn getnext_from_prefix_serves_first_with_leading_dot() {
        let input = format!("getnext\n{}\n", prefix());
        let lines = run(&input);
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with('.'));
        assert_eq!(lines[1], "integer");
    }

    #[test]
    fn getnext_walk_visits_every_record_once_then_none() {
        let snapshot = snapshot();
        let handler = ProtocolHandler::new(&snapshot);

        let mut visited = Vec::new();
        let mut current = prefix().to_string();
        loop {
            let mut output = Vec::new();
            let input = format!("getnext\n{}\n", current);
            handler.serve(Cursor::new(input), &mut output).unwrap();
            let reply = String::from_utf8(output).unwrap();
            let lines: Vec<&str> = reply.lines().collect();
            if lines == ["NONE"] {
                break;
            }
            visited.push(lines[0].to_string());
            current = lines[0].to_string();
        }

        assert_eq!(visited.len(), 3);
        let mut unique = visited.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), 3);
    }

    #[test]
    fn set_is_always_rejected() {
        let oid = prefix().encode_name("sshd");
        let input = format!("set\n{}\ninteger 1\n", oid);
        assert_eq!(run(&input), ["not-writable"]);
    }

    #[test]
    fn unrecognized_command_is_skipped_and_loop_continues() {
        let input = "HELO\nPING\n";
        assert_eq!(run(input), ["PONG"]);
    }

    #[test]
    fn malformed_oid_answers_none_and_loop_continues() {
        let input = "get\nnot-an-oid\nPING\n";
        assert_eq!(run(input), ["NONE", "PONG"]);
    }

    #[test]
    fn empty_line_terminates() {
        assert_eq!(run("\nPING\n"), Vec::<String>::new());
    }

    #[test]
    fn eof_terminates() {
        assert_eq!(run(""), Vec::<String>::new());
    }
}
