//! Sending finished reports back to the chat

use super::keyboard::back_keyboard;
use crate::api::telegram::ChatTransport;
use crate::chart::ChartOutcome;
use crate::error::{CryptoError, Result};
use crate::symbol::Symbol;
use tracing::{info, warn};

/// Telegram limit for photo captions, in UTF-16 code units
pub const CAPTION_LIMIT: usize = 1024;

/// Telegram limit for text messages, in UTF-16 code units
pub const MESSAGE_LIMIT: usize = 4096;

/// Length as Telegram counts it
pub fn utf16_len(text: &str) -> usize {
    text.encode_utf16().count()
}

/// Byte offset of the longest prefix that fits in `limit` UTF-16 units
fn fitting_prefix(text: &str, limit: usize) -> usize {
    let mut units = 0;
    for (offset, c) in text.char_indices() {
        units += c.len_utf16();
        if units > limit {
            return offset;
        }
    }
    text.len()
}

/// Prefix of at most `limit` UTF-16 units, ending in an ellipsis when cut
pub fn truncate_utf16(text: &str, limit: usize) -> String {
    if utf16_len(text) <= limit {
        return text.to_string();
    }
    let end = fitting_prefix(text, limit.saturating_sub(1));
    format!("{}…", &text[..end])
}

/// Split into chunks of at most `limit` UTF-16 units, preferring line breaks
///
/// A chunk always holds at least one character, so a `limit` smaller than a
/// single character still makes progress.
pub fn split_chunks(text: &str, limit: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut rest = text;

    while utf16_len(rest) > limit {
        let mut end = fitting_prefix(rest, limit);
        if end == 0 {
            end = rest.chars().next().map_or(rest.len(), char::len_utf8);
        }
        let cut = rest[..end]
            .rfind('\n')
            .filter(|&i| i > 0)
            .map_or(end, |i| i + 1);
        chunks.push(rest[..cut].to_string());
        rest = &rest[cut..];
    }
    if !rest.is_empty() || chunks.is_empty() {
        chunks.push(rest.to_string());
    }
    chunks
}

/// Send `text` over as many messages as needed, the back button on the last
pub async fn send_long_text(transport: &dyn ChatTransport, chat_id: i64, text: &str) -> Result<()> {
    let chunks = split_chunks(text, MESSAGE_LIMIT);
    let last = chunks.len() - 1;
    for (i, chunk) in chunks.iter().enumerate() {
        let markup = (i == last).then(back_keyboard);
        transport.send_text(chat_id, chunk, markup).await?;
    }
    Ok(())
}

/// Deliver a report with its chart, or with the chart's error text
///
/// The chart file is removed when this returns, whether or not sending
/// succeeded.
pub async fn deliver_report(
    transport: &dyn ChatTransport,
    chat_id: i64,
    report: &str,
    chart: ChartOutcome,
) -> Result<()> {
    match chart {
        ChartOutcome::Unavailable(error) => {
            info!(chat_id, "Delivering report without chart");
            send_long_text(transport, chat_id, &format!("{report}\n\n{error}")).await
        }
        ChartOutcome::Rendered(artifact) => {
            let fits = utf16_len(report) <= CAPTION_LIMIT;
            let (caption, markup) = if fits {
                (report.to_string(), Some(back_keyboard()))
            } else {
                info!(chat_id, length = utf16_len(report), "Report exceeds caption limit");
                (truncate_utf16(report, CAPTION_LIMIT), None)
            };

            match transport
                .send_photo(chat_id, artifact.path(), &caption, markup)
                .await
            {
                Ok(_) if fits => {}
                Ok(_) => send_long_text(transport, chat_id, report).await?,
                Err(e) => {
                    warn!(chat_id, error = %e, "Photo rejected, sending report as text");
                    send_long_text(transport, chat_id, report).await?;
                }
            }
            info!(chat_id, "Report delivered with chart");
            Ok(())
        }
    }
}

/// Tell the user the pipeline failed
pub async fn deliver_failure(
    transport: &dyn ChatTransport,
    chat_id: i64,
    symbol: &Symbol,
    error: &CryptoError,
) -> Result<()> {
    warn!(chat_id, symbol = %symbol, error = %error, "Reporting pipeline failure to user");
    let text = format!("⚠️ Failed to generate the summary for {symbol}: {error}");
    send_long_text(transport, chat_id, &text).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::telegram::MockChatTransport;
    use crate::chart::ChartArtifact;
    use mockall::Sequence;
    use temp_dir::TempDir;

    #[test]
    fn test_truncate_counts_utf16_units() {
        assert_eq!(truncate_utf16("short", 10), "short");

        let cut = truncate_utf16(&"é".repeat(20), 10);
        assert_eq!(cut.chars().count(), 10);
        assert!(cut.ends_with('…'));

        // each emoji is a surrogate pair
        let cut = truncate_utf16(&"📈".repeat(20), 10);
        assert_eq!(utf16_len(&cut), 9);
        assert_eq!(cut, format!("{}…", "📈".repeat(4)));
    }

    #[test]
    fn test_split_keeps_surrogate_pairs_whole() {
        let chunks = split_chunks(&"📈".repeat(5), 4);
        assert_eq!(chunks, vec!["📈📈", "📈📈", "📈"]);
        assert!(chunks.iter().all(|c| utf16_len(c) <= 4));
    }

    #[test]
    fn test_split_with_tiny_limit_terminates() {
        assert_eq!(split_chunks("abc", 0), vec!["a", "b", "c"]);
        assert_eq!(split_chunks("📈a", 1), vec!["📈", "a"]);
    }

    #[test]
    fn test_split_prefers_newlines() {
        let text = format!("{}\n{}", "a".repeat(6), "b".repeat(6));
        assert_eq!(split_chunks(&text, 8), vec!["aaaaaa\n", "bbbbbb"]);
    }

    #[test]
    fn test_split_without_newlines() {
        assert_eq!(split_chunks("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
        assert_eq!(split_chunks("", 4), vec![""]);
    }

    #[tokio::test]
    async fn test_chart_error_appended_to_report() {
        let mut transport = MockChatTransport::new();
        transport
            .expect_send_text()
            .withf(|chat_id, text, markup| {
                *chat_id == 7
                    && text == "Report body\n\n❌ No data found for ZZZ"
                    && markup.as_ref() == Some(&back_keyboard())
            })
            .times(1)
            .returning(|_, _, _| Ok(1));
        transport.expect_send_photo().times(0);

        deliver_report(
            &transport,
            7,
            "Report body",
            ChartOutcome::Unavailable("❌ No data found for ZZZ".into()),
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_long_report_splits_caption() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("BTC_chart-test.png");
        std::fs::write(&path, b"png").unwrap();

        let report = "x".repeat(CAPTION_LIMIT + 100);
        let mut seq = Sequence::new();
        let mut transport = MockChatTransport::new();
        transport
            .expect_send_photo()
            .withf(|_, _, caption, markup| {
                utf16_len(caption) == CAPTION_LIMIT && markup.is_none()
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _, _| Ok(1));
        let expected = report.clone();
        transport
            .expect_send_text()
            .withf(move |_, text, markup| text == expected && markup.is_some())
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Ok(2));

        deliver_report(
            &transport,
            7,
            &report,
            ChartOutcome::Rendered(ChartArtifact::new(&path)),
        )
        .await
        .unwrap();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_emoji_report_over_caption_limit_is_cut() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("DOGE_chart-test.png");
        std::fs::write(&path, b"png").unwrap();

        // 900 chars but 1800 UTF-16 units
        let report = "📈".repeat(900);
        let mut seq = Sequence::new();
        let mut transport = MockChatTransport::new();
        transport
            .expect_send_photo()
            .withf(|_, _, caption, markup| {
                utf16_len(caption) <= CAPTION_LIMIT && caption.ends_with('…') && markup.is_none()
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _, _| Ok(1));
        let expected = report.clone();
        transport
            .expect_send_text()
            .withf(move |_, text, _| text == expected)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Ok(2));

        deliver_report(
            &transport,
            7,
            &report,
            ChartOutcome::Rendered(ChartArtifact::new(&path)),
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_rejected_photo_falls_back_to_text() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ETH_chart-test.png");
        std::fs::write(&path, b"png").unwrap();

        let mut transport = MockChatTransport::new();
        transport
            .expect_send_photo()
            .returning(|_, _, _, _| Err(CryptoError::Telegram("sendPhoto failed".into())));
        transport
            .expect_send_text()
            .withf(|_, text, markup| text == "report" && markup.is_some())
            .times(1)
            .returning(|_, _, _| Ok(2));

        deliver_report(
            &transport,
            7,
            "report",
            ChartOutcome::Rendered(ChartArtifact::new(&path)),
        )
        .await
        .unwrap();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_chart_removed_when_all_sends_fail() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("SOL_chart-test.png");
        std::fs::write(&path, b"png").unwrap();

        let mut transport = MockChatTransport::new();
        transport
            .expect_send_photo()
            .returning(|_, _, _, _| Err(CryptoError::Telegram("sendPhoto failed".into())));
        transport
            .expect_send_text()
            .returning(|_, _, _| Err(CryptoError::Telegram("sendMessage failed".into())));

        let result = deliver_report(
            &transport,
            7,
            "report",
            ChartOutcome::Rendered(ChartArtifact::new(&path)),
        )
        .await;
        assert!(result.is_err());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_failure_text() {
        let mut transport = MockChatTransport::new();
        transport
            .expect_send_text()
            .withf(|_, text, _| {
                text == "⚠️ Failed to generate the summary for BTC: Agent processing failed: LLM down"
            })
            .times(1)
            .returning(|_, _, _| Ok(1));

        let error = CryptoError::Agent(agent_core::Error::ProcessingFailed("LLM down".into()));
        deliver_failure(&transport, 7, &Symbol::new("BTC"), &error)
            .await
            .unwrap();
    }
}
