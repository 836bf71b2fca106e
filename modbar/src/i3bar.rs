//! i3bar JSON protocol: status lines out, click events in

use anyhow::Context;
use log::{debug, info, warn};
use modbar_core::{
    Align, BarError, Block, Button, ClickDispatcher, ClickEvent, ColorScheme, RenderSink, Severity,
};
use serde::{Deserialize, Serialize};
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

const HEADER: &str = r#"{"version":1,"click_events":true}"#;

#[derive(Debug, Serialize)]
struct I3Block<'a> {
    full_text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    color: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    urgent: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    min_width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    align: Option<&'static str>,
    separator: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    separator_block_width: Option<u32>,
    name: &'a str,
    instance: String,
}

impl<'a> I3Block<'a> {
    fn new(block: &'a Block, scheme: &ColorScheme) -> Self {
        let segment = &block.segment;
        let fallback = if segment.is_urgent() {
            Severity::Urgent
        } else {
            Severity::Normal
        };
        let color = segment
            .get_color()
            .and_then(|c| c.resolve(scheme))
            .or_else(|| scheme.color_for(fallback).map(str::to_string));
        let min_width = segment.get_min_width();
        let align = min_width.map(|_| match segment.get_align() {
            Align::Start => "left",
            Align::End => "right",
        });
        Self {
            full_text: segment.get_text(),
            color,
            urgent: segment.is_urgent(),
            min_width,
            align,
            separator: segment.has_separator(),
            separator_block_width: segment.get_padding(),
            name: &block.name,
            instance: block.instance.to_string(),
        }
    }
}

/// Writes the status line protocol to any writer, normally stdout.
pub struct I3barSink<W: Write + Send> {
    out: W,
    lines: u64,
}

impl<W: Write + Send> I3barSink<W> {
    pub fn new(out: W) -> Self {
        Self { out, lines: 0 }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_line(&mut self, line: &[Block], scheme: &ColorScheme) -> anyhow::Result<()> {
        if self.lines == 0 {
            writeln!(self.out, "{}", HEADER)?;
            writeln!(self.out, "[")?;
        } else {
            write!(self.out, ",")?;
        }
        let blocks: Vec<I3Block> = line.iter().map(|b| I3Block::new(b, scheme)).collect();
        serde_json::to_writer(&mut self.out, &blocks)?;
        writeln!(self.out)?;
        self.out.flush()?;
        self.lines += 1;
        Ok(())
    }
}

impl<W: Write + Send> RenderSink for I3barSink<W> {
    fn render(&mut self, line: &[Block], scheme: &ColorScheme) -> modbar_core::Result<()> {
        self.write_line(line, scheme)
            .map_err(|e| BarError::render(format!("{:#}", e)))
    }
}

#[derive(Debug, Deserialize)]
struct RawClick {
    name: Option<String>,
    instance: Option<String>,
    button: u8,
}

/// Parse one line of the click stream. The stream is an endless JSON array,
/// so a line may be the opening `[` or carry a leading comma.
pub fn parse_click(line: &str) -> anyhow::Result<Option<ClickEvent>> {
    let body = line.trim().trim_start_matches(['[', ',']).trim();
    if body.is_empty() {
        return Ok(None);
    }
    let raw: RawClick =
        serde_json::from_str(body).with_context(|| format!("malformed click event: {}", body))?;
    let Some(name) = raw.name else {
        return Ok(None);
    };
    let instance = match raw.instance.as_deref() {
        Some(text) => text
            .parse()
            .with_context(|| format!("bad instance `{}` for `{}`", text, name))?,
        None => 0,
    };
    Ok(Some(ClickEvent {
        name,
        instance,
        button: Button::from(raw.button),
    }))
}

/// Forward click events from the bar host until the input ends.
pub async fn read_clicks<R>(input: R, clicks: ClickDispatcher) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        match parse_click(&line) {
            Ok(Some(event)) => {
                debug!("Click {:?} on {}#{}", event.button, event.name, event.instance);
                clicks.dispatch(event)?;
            }
            Ok(None) => {}
            Err(e) => warn!("{:#}", e),
        }
    }
    info!("Click stream closed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use modbar_core::{Origin, Segment};

    fn block(name: &str, segment: Segment) -> Block {
        Block {
            name: name.to_string(),
            instance: 0,
            origin: Origin::Module,
            segment,
        }
    }

    #[test]
    fn writes_header_then_comma_separated_lines() {
        let scheme = ColorScheme::default();
        let mut sink = I3barSink::new(Vec::new());
        sink.render(&[block("clock", Segment::text("12:00"))], &scheme)
            .unwrap();
        sink.render(&[block("clock", Segment::text("12:01"))], &scheme)
            .unwrap();

        let text = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], HEADER);
        assert_eq!(lines[1], "[");
        assert!(lines[2].starts_with("[{"));
        assert!(lines[3].starts_with(",[{"));
        assert!(lines[3].contains("12:01"));
    }

    #[test]
    fn block_fields_follow_the_segment() {
        let scheme = ColorScheme::default();
        let mut sink = I3barSink::new(Vec::new());
        let segment = Segment::text("load")
            .semantic(Severity::Bad)
            .min_width(60)
            .align(Align::End)
            .separator(false)
            .padding(8);
        sink.render(&[block("load", segment)], &scheme).unwrap();

        let text = String::from_utf8(sink.into_inner()).unwrap();
        let json: serde_json::Value = serde_json::from_str(text.lines().nth(2).unwrap()).unwrap();
        let b = &json[0];
        assert_eq!(b["full_text"], "load");
        assert_eq!(b["color"], scheme.bad.as_str());
        assert_eq!(b["min_width"], 60);
        assert_eq!(b["align"], "right");
        assert_eq!(b["separator"], false);
        assert_eq!(b["separator_block_width"], 8);
        assert_eq!(b["name"], "load");
        assert_eq!(b["instance"], "0");
        assert!(b.get("urgent").is_none());
    }

    #[test]
    fn parses_click_stream_lines() {
        assert!(parse_click("[").unwrap().is_none());
        let first = parse_click(r#"{"name":"clock","instance":"1","button":1,"x":10}"#)
            .unwrap()
            .unwrap();
        assert_eq!(first.name, "clock");
        assert_eq!(first.instance, 1);
        assert_eq!(first.button, Button::Left);

        let next = parse_click(r#",{"name":"sysinfo","button":3}"#).unwrap().unwrap();
        assert_eq!(next.instance, 0);
        assert_eq!(next.button, Button::Right);

        assert!(parse_click(r#",{"button":1}"#).unwrap().is_none());
        assert!(parse_click("{oops").is_err());
    }

    #[tokio::test]
    async fn click_reader_skips_garbage() {
        use modbar_core::{BarBuilder, Output, StaticModule};
        use std::sync::{Arc, Mutex};
        use std::time::Duration;

        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut builder = BarBuilder::new(&Default::default(), ColorScheme::default());
        for name in ["a", "b"] {
            let seen = seen.clone();
            let output = Output::from(Segment::text(name))
                .on_click(move |ev| seen.lock().unwrap().push(ev.clone()));
            builder.add(name, StaticModule::new(output)).unwrap();
        }
        let clicks = builder.clicks();
        let bar = builder.build();
        let mut lines = bar.watch();
        tokio::spawn(bar.run(I3barSink::new(Vec::new())));
        lines.wait_for(|line| line.len() == 2).await.unwrap();

        let input = "[\n{\"name\":\"a\",\"button\":1}\nnot json\n,{\"name\":\"b\",\"button\":2}\n";
        read_clicks(input.as_bytes(), clicks).await.unwrap();

        tokio::time::timeout(Duration::from_secs(5), async {
            while seen.lock().unwrap().len() < 2 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
        let seen = seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![
                ClickEvent {
                    name: "a".to_string(),
                    instance: 0,
                    button: Button::Left,
                },
                ClickEvent {
                    name: "b".to_string(),
                    instance: 0,
                    button: Button::Middle,
                },
            ]
        );
    }
}
