use std::sync::Arc;

use tracing::{info, warn};
use voxlink::{
    ChatId, Scheduler, SchedulerResult,
    common::format_time,
    protocol::{EnqueueOutcome, PlaybackState, Requester, Track},
    resolver::{CatalogResolver, TrackResolver},
    transport::LoopbackController,
};

/// One console line, already parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Join(ChatId),
    Play {
        chat_id: ChatId,
        query: String,
        video: bool,
        force: bool,
    },
    Skip(ChatId),
    Pause(ChatId),
    Resume(ChatId),
    Seek(ChatId, i64),
    Loop(ChatId, u32),
    Clear(ChatId),
    Queue(ChatId),
    Ended(ChatId),
    End(ChatId),
    Reset(ChatId),
    Help,
}

pub const HELP: &str = "\
commands:
  join <chat>
  play <chat> <query>     vplay <chat> <query>     fplay <chat> <query>
  skip <chat>   pause <chat>   resume <chat>   seek <chat> <+/-secs>
  loop <chat> <count>   clear <chat>   queue <chat>
  ended <chat>   end <chat>   reset <chat>";

pub fn parse(line: &str) -> Result<Command, String> {
    let mut parts = line.split_whitespace();
    let Some(name) = parts.next() else {
        return Err("empty command".into());
    };
    if name == "help" {
        return Ok(Command::Help);
    }

    let chat_id: ChatId = parts
        .next()
        .ok_or_else(|| format!("{name}: missing chat id"))?
        .parse()
        .map_err(|e| format!("{name}: bad chat id: {e}"))?;
    let rest: Vec<&str> = parts.collect();

    let number = |what: &str| -> Result<i64, String> {
        rest.first()
            .ok_or_else(|| format!("{name}: missing {what}"))?
            .parse()
            .map_err(|e| format!("{name}: bad {what}: {e}"))
    };

    let command = match name {
        "join" => Command::Join(chat_id),
        "play" | "vplay" | "fplay" => {
            if rest.is_empty() {
                return Err(format!("{name}: missing query"));
            }
            Command::Play {
                chat_id,
                query: rest.join(" "),
                video: name == "vplay",
                force: name == "fplay",
            }
        }
        "skip" => Command::Skip(chat_id),
        "pause" => Command::Pause(chat_id),
        "resume" => Command::Resume(chat_id),
        "seek" => Command::Seek(chat_id, number("seconds")?),
        "loop" => {
            let count = u32::try_from(number("count")?).map_err(|e| format!("loop: {e}"))?;
            Command::Loop(chat_id, count)
        }
        "clear" => Command::Clear(chat_id),
        "queue" => Command::Queue(chat_id),
        "ended" => Command::Ended(chat_id),
        "end" => Command::End(chat_id),
        "reset" => Command::Reset(chat_id),
        other => return Err(format!("unknown command: {other}")),
    };
    Ok(command)
}

/// Tracks the console can find by name.
pub fn demo_catalog(catalog: &CatalogResolver) {
    let curator = Requester::new(0u64, "catalog");
    for (title, secs) in [
        ("Blue Monday", 448),
        ("Heroes", 371),
        ("Windowlicker", 366),
        ("Teardrop", 330),
        ("Short Jingle", 12),
        ("Live Stream", 0),
    ] {
        let slug = title.to_lowercase().replace(' ', "-");
        catalog.insert(Track::new(
            title,
            format!("loopback://{slug}"),
            secs,
            curator.clone(),
        ));
    }
}

pub struct Console {
    pub scheduler: Scheduler,
    pub transport: LoopbackController,
    pub catalog: Arc<CatalogResolver>,
    pub operator: Requester,
}

impl Console {
    pub fn new(
        scheduler: Scheduler,
        transport: LoopbackController,
        catalog: Arc<CatalogResolver>,
    ) -> Self {
        Self {
            scheduler,
            transport,
            catalog,
            operator: Requester::new(1u64, "console"),
        }
    }

    pub async fn run(&self, command: Command) {
        let s = &self.scheduler;
        let result = match command {
            Command::Help => {
                println!("{HELP}");
                Ok(())
            }
            Command::Join(chat_id) => s.connect(chat_id).await,
            Command::Play {
                chat_id,
                query,
                video,
                force,
            } => {
                if force {
                    self.force_play(chat_id, &query, video).await
                } else {
                    s.play_query(chat_id, &query, self.operator.clone(), video)
                        .await
                        .map(|outcome| match outcome {
                            EnqueueOutcome::Started => info!("[{}] Started {}", chat_id, query),
                            EnqueueOutcome::Queued { position } => {
                                info!("[{}] Queued {} at #{}", chat_id, query, position)
                            }
                        })
                }
            }
            Command::Skip(chat_id) => s.skip(chat_id).await,
            Command::Pause(chat_id) => s.pause(chat_id).await,
            Command::Resume(chat_id) => s.resume(chat_id).await,
            Command::Seek(chat_id, delta) => s
                .seek(chat_id, delta)
                .await
                .map(|pos| println!("[{}] at {}", chat_id, format_time(pos))),
            Command::Loop(chat_id, count) => s.set_loop(chat_id, count).await,
            Command::Clear(chat_id) => {
                let cleared = s.clear_queue(chat_id).await;
                println!("[{}] cleared {} track(s)", chat_id, cleared);
                Ok(())
            }
            Command::Queue(chat_id) => {
                self.print_queue(chat_id).await;
                Ok(())
            }
            Command::Ended(chat_id) => {
                if !self.transport.finish(chat_id) {
                    println!("[{}] no live stream", chat_id);
                }
                Ok(())
            }
            Command::End(chat_id) => {
                s.end(chat_id).await;
                Ok(())
            }
            Command::Reset(chat_id) => {
                s.reset(chat_id).await;
                Ok(())
            }
        };

        if let Err(e) = result {
            warn!("{}", e);
        }
    }

    async fn force_play(&self, chat_id: ChatId, query: &str, video: bool) -> SchedulerResult<()> {
        let track = self
            .catalog
            .resolve(query, video, self.operator.clone())
            .await?;
        self.scheduler.force_play(chat_id, track).await
    }

    async fn print_queue(&self, chat_id: ChatId) {
        let Some(snapshot) = self.scheduler.snapshot(chat_id).await else {
            println!("[{}] unknown chat", chat_id);
            return;
        };

        match (&snapshot.state, &snapshot.now_playing) {
            (PlaybackState::Playing, Some(np)) => println!(
                "[{}] now: {} [{}/{}]{}{}",
                chat_id,
                np.track.title,
                format_time(np.elapsed_secs),
                format_time(np.total_secs),
                if np.paused { " (paused)" } else { "" },
                if snapshot.loop_remaining > 0 {
                    format!(" loop x{}", snapshot.loop_remaining)
                } else {
                    String::new()
                },
            ),
            _ => println!("[{}] idle", chat_id),
        }

        for (i, entry) in snapshot.queue.iter().enumerate() {
            println!(
                "  {}. {} ({}) by {}",
                i + 1,
                entry.title,
                format_time(entry.duration_secs),
                entry.requested_by.display_name
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_play_variants() {
        assert_eq!(
            parse("vplay -100 blue monday").unwrap(),
            Command::Play {
                chat_id: ChatId(-100),
                query: "blue monday".into(),
                video: true,
                force: false,
            }
        );
        assert!(matches!(
            parse("fplay 5 heroes").unwrap(),
            Command::Play { force: true, video: false, .. }
        ));
        assert!(parse("play 5").is_err());
    }

    #[test]
    fn test_parse_numeric_arguments() {
        assert_eq!(parse("seek 7 -15").unwrap(), Command::Seek(ChatId(7), -15));
        assert_eq!(parse("loop 7 3").unwrap(), Command::Loop(ChatId(7), 3));
        assert!(parse("loop 7 -1").is_err());
        assert!(parse("seek 7").is_err());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse("").is_err());
        assert!(parse("dance 1").is_err());
        assert!(parse("skip abc").is_err());
        assert_eq!(parse("help").unwrap(), Command::Help);
    }
}
