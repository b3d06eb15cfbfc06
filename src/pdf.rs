//! Minimal PDF writer for the summary and quiz-review downloads.
//!
//! Emits PDF 1.4 with the two built-in Helvetica fonts, one uncompressed
//! content stream per page, and a classic xref table. Text is encoded as
//! Latin-1; characters outside that range are replaced with `?`. Letter-size
//! pages, a y-cursor walking down from the title, page break near the bottom
//! margin.

use crate::domain::QuizRecord;

const PAGE_WIDTH: f32 = 612.0;
const PAGE_HEIGHT: f32 = 792.0;
const MARGIN_X: f32 = 100.0;
const INDENT_X: f32 = 120.0;
const TITLE_Y: f32 = 750.0;
const BODY_TOP_Y: f32 = 720.0;
const MIN_Y: f32 = 50.0;
const WRAP_CHARS: usize = 90;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Font {
  Helvetica,
  HelveticaBold,
}

impl Font {
  fn resource_name(&self) -> &'static str {
    match self {
      Font::Helvetica => "/F1",
      Font::HelveticaBold => "/F2",
    }
  }
}

/// Page-oriented drawing surface: set a font, draw strings at absolute
/// coordinates, finish pages, then serialize the whole document.
pub struct PdfCanvas {
  pages: Vec<String>,
  current: String,
  font: Font,
  size: f32,
}

impl PdfCanvas {
  pub fn new() -> Self {
    Self { pages: Vec::new(), current: String::new(), font: Font::Helvetica, size: 12.0 }
  }

  pub fn set_font(&mut self, font: Font, size: f32) {
    self.font = font;
    self.size = size;
  }

  pub fn draw_string(&mut self, x: f32, y: f32, text: &str) {
    let op = format!(
      "BT {} {:.1} Tf {:.1} {:.1} Td ({}) Tj ET\n",
      self.font.resource_name(),
      self.size,
      x,
      y,
      escape_text(text)
    );
    self.current.push_str(&op);
  }

  /// Close the current page. Consecutive calls produce blank pages, matching
  /// canvas semantics.
  pub fn show_page(&mut self) {
    self.pages.push(std::mem::take(&mut self.current));
  }

  /// Serialize the document. An unfinished page is closed implicitly; an
  /// empty document still gets one blank page so the file stays valid.
  pub fn save(mut self) -> Vec<u8> {
    if !self.current.is_empty() {
      self.show_page();
    }
    if self.pages.is_empty() {
      self.pages.push(String::new());
    }

    let page_count = self.pages.len();
    let total_objects = 4 + 2 * page_count;
    let mut buf: Vec<u8> = b"%PDF-1.4\n".to_vec();
    let mut offsets = vec![0usize; total_objects + 1];

    let kids = (0..page_count)
      .map(|i| format!("{} 0 R", 5 + 2 * i))
      .collect::<Vec<_>>()
      .join(" ");

    write_object(&mut buf, &mut offsets, 1, b"<< /Type /Catalog /Pages 2 0 R >>");
    write_object(
      &mut buf,
      &mut offsets,
      2,
      format!("<< /Type /Pages /Kids [{kids}] /Count {page_count} >>").as_bytes(),
    );
    write_object(&mut buf, &mut offsets, 3, b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>");
    write_object(&mut buf, &mut offsets, 4, b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica-Bold >>");

    for (i, ops) in self.pages.iter().enumerate() {
      let page_num = 5 + 2 * i;
      let contents_num = page_num + 1;
      let page_body = format!(
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {PAGE_WIDTH:.0} {PAGE_HEIGHT:.0}] \
         /Resources << /Font << /F1 3 0 R /F2 4 0 R >> >> /Contents {contents_num} 0 R >>"
      );
      write_object(&mut buf, &mut offsets, page_num, page_body.as_bytes());

      let stream = encode_latin1(ops);
      offsets[contents_num] = buf.len();
      buf.extend_from_slice(format!("{contents_num} 0 obj\n<< /Length {} >>\nstream\n", stream.len()).as_bytes());
      buf.extend_from_slice(&stream);
      buf.extend_from_slice(b"\nendstream\nendobj\n");
    }

    let xref_offset = buf.len();
    buf.extend_from_slice(format!("xref\n0 {}\n", total_objects + 1).as_bytes());
    buf.extend_from_slice(b"0000000000 65535 f \n");
    for num in 1..=total_objects {
      buf.extend_from_slice(format!("{:010} 00000 n \n", offsets[num]).as_bytes());
    }
    buf.extend_from_slice(
      format!(
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref_offset}\n%%EOF\n",
        total_objects + 1
      )
      .as_bytes(),
    );

    buf
  }
}

impl Default for PdfCanvas {
  fn default() -> Self {
    Self::new()
  }
}

fn write_object(buf: &mut Vec<u8>, offsets: &mut [usize], num: usize, body: &[u8]) {
  offsets[num] = buf.len();
  buf.extend_from_slice(format!("{num} 0 obj\n").as_bytes());
  buf.extend_from_slice(body);
  buf.extend_from_slice(b"\nendobj\n");
}

/// Escape `(`/`)`/`\` and flatten characters a literal string cannot carry.
fn escape_text(text: &str) -> String {
  let mut out = String::with_capacity(text.len());
  for c in text.chars() {
    match c {
      '\\' => out.push_str("\\\\"),
      '(' => out.push_str("\\("),
      ')' => out.push_str("\\)"),
      c if c.is_control() => out.push(' '),
      c if (c as u32) > 0xFF => out.push('?'),
      c => out.push(c),
    }
  }
  out
}

fn encode_latin1(s: &str) -> Vec<u8> {
  s.chars().map(|c| if (c as u32) <= 0xFF { c as u8 } else { b'?' }).collect()
}

/// Split text into drawable lines: hard newlines respected, long lines
/// word-wrapped to roughly `max_chars`.
fn wrap_lines(text: &str, max_chars: usize) -> Vec<String> {
  let mut out = Vec::new();
  for raw in text.lines() {
    let line = raw.trim_end();
    if line.chars().count() <= max_chars {
      out.push(line.to_string());
      continue;
    }
    let mut cur = String::new();
    for word in line.split_whitespace() {
      if !cur.is_empty() && cur.chars().count() + 1 + word.chars().count() > max_chars {
        out.push(std::mem::take(&mut cur));
      }
      if !cur.is_empty() {
        cur.push(' ');
      }
      cur.push_str(word);
    }
    if !cur.is_empty() {
      out.push(cur);
    }
  }
  out
}

/// "Notes Summary" title plus the wrapped summary body.
pub fn render_summary_pdf(summary: &str) -> Vec<u8> {
  let mut canvas = PdfCanvas::new();
  canvas.set_font(Font::HelveticaBold, 16.0);
  canvas.draw_string(MARGIN_X, TITLE_Y, "Notes Summary");
  canvas.set_font(Font::Helvetica, 12.0);

  let mut y = BODY_TOP_Y;
  for line in wrap_lines(summary, WRAP_CHARS) {
    if y < MIN_Y {
      canvas.show_page();
      y = TITLE_Y;
    }
    canvas.draw_string(MARGIN_X, y, &line);
    y -= 20.0;
  }
  canvas.save()
}

/// Question-by-question review: question, the user's answer, the correct one.
pub fn render_quiz_review_pdf(record: &QuizRecord) -> Vec<u8> {
  let mut canvas = PdfCanvas::new();
  canvas.set_font(Font::HelveticaBold, 16.0);
  canvas.draw_string(
    MARGIN_X,
    TITLE_Y,
    &format!("Quiz Review - {}", record.date.format("%Y-%m-%d")),
  );
  canvas.set_font(Font::Helvetica, 12.0);

  let mut y = BODY_TOP_Y;
  for (i, q) in record.questions.iter().enumerate() {
    canvas.draw_string(MARGIN_X, y, &format!("Q{}: {}", i + 1, q.question));
    y -= 20.0;
    let yours = q.user_answer.map(|k| k.to_string()).unwrap_or_else(|| "N/A".into());
    canvas.draw_string(INDENT_X, y, &format!("Your answer: {yours}"));
    y -= 20.0;
    let correct = q.answer.map(|k| k.to_string()).unwrap_or_else(|| "N/A".into());
    canvas.draw_string(INDENT_X, y, &format!("Correct answer: {correct}"));
    y -= 30.0;
    if y < MIN_Y {
      canvas.show_page();
      y = TITLE_Y;
    }
  }
  canvas.save()
}

#[cfg(test)]
mod tests {
  use std::collections::BTreeMap;

  use chrono::Utc;
  use uuid::Uuid;

  use super::*;
  use crate::domain::{AttemptedQuestion, OptionKey};

  fn sample_record(question_count: usize) -> QuizRecord {
    let questions = (0..question_count)
      .map(|i| AttemptedQuestion {
        question: format!("Question number {i}?"),
        options: BTreeMap::new(),
        answer: Some(OptionKey::B),
        user_answer: if i % 2 == 0 { Some(OptionKey::A) } else { None },
      })
      .collect();
    QuizRecord {
      id: Uuid::new_v4(),
      summary: None,
      score: Some(3),
      total: Some(10),
      questions,
      date: Utc::now(),
    }
  }

  fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
  }

  #[test]
  fn document_has_header_trailer_and_valid_xref_offset() {
    let bytes = render_summary_pdf("- point one\n- point two");
    assert!(bytes.starts_with(b"%PDF-1.4"));
    assert!(bytes.ends_with(b"%%EOF\n"));

    let start = find_subsequence(&bytes, b"startxref\n").unwrap() + "startxref\n".len();
    let rest = std::str::from_utf8(&bytes[start..]).unwrap();
    let offset: usize = rest.lines().next().unwrap().trim().parse().unwrap();
    assert_eq!(&bytes[offset..offset + 4], b"xref");
  }

  #[test]
  fn parentheses_and_backslashes_are_escaped() {
    assert_eq!(escape_text(r"a(b)c\d"), r"a\(b\)c\\d");
    assert_eq!(escape_text("tab\there"), "tab here");
    assert_eq!(escape_text("汉字"), "??");
  }

  #[test]
  fn long_reviews_break_onto_additional_pages() {
    let bytes = render_quiz_review_pdf(&sample_record(12));
    assert!(find_subsequence(&bytes, b"/Count 2").is_some());

    let short = render_quiz_review_pdf(&sample_record(2));
    assert!(find_subsequence(&short, b"/Count 1").is_some());
  }

  #[test]
  fn empty_summary_still_yields_one_page() {
    let bytes = render_summary_pdf("");
    assert!(find_subsequence(&bytes, b"/Count 1").is_some());
    assert!(find_subsequence(&bytes, b"Notes Summary").is_some());
  }

  #[test]
  fn wrap_respects_newlines_and_width() {
    let lines = wrap_lines("short\nthis line is definitely much longer than ten characters", 10);
    assert_eq!(lines[0], "short");
    assert!(lines.len() > 2);
    assert!(lines.iter().all(|l| l.chars().count() <= 14)); // words never split
  }
}
