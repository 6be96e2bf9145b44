use crate::markup::Markup;
use crate::model::{ContentId, DocumentModel, EdlId, SequenceId, ZettelId};
use crate::sequences::SequenceMember;

use super::normalize::{content_key, incoming_labels, sequence_label};

/// Indented, human-readable dump of a model.
///
/// ```text
/// edl doc [0]
///   link para #0 depth 0
///   zettel 0:0.0 span:o:0:5 "hello" <- para.text {bold=true}
///   sequence para.text@0:0.0
///     zettel 0:0.0
/// ```
pub fn outline(model: &DocumentModel) -> String {
    let mut lines = Vec::new();
    edl_lines(model, model.root(), 0, &mut lines);
    lines.join("\n")
}

fn push(lines: &mut Vec<String>, indent: usize, line: String) {
    lines.push(format!("{}{line}", "  ".repeat(indent)));
}

fn markup_suffix(markup: &Markup) -> String {
    if markup.is_empty() {
        return String::new();
    }
    let pairs: Vec<String> = markup.iter().map(|(k, v)| format!("{k}={v}")).collect();
    format!(" {{{}}}", pairs.join(", "))
}

fn edl_lines(model: &DocumentModel, id: EdlId, indent: usize, lines: &mut Vec<String>) {
    let edl = model.edl(id);
    let missing = if edl.is_missing { " missing" } else { "" };
    push(
        lines,
        indent,
        format!("edl {} [{}]{missing}{}", edl.pointer.name, edl.key, markup_suffix(&edl.markup)),
    );

    for &link_id in &edl.links {
        let link = model.link(link_id);
        let default = if link.is_default { " default" } else { "" };
        push(
            lines,
            indent + 1,
            format!(
                "link {} #{} depth {}{default}{}",
                link.pointer.name,
                link.index,
                link.depth,
                markup_suffix(&link.markup)
            ),
        );
    }

    for &content in &edl.content {
        match content {
            ContentId::Zettel(zettel) => push(lines, indent + 1, zettel_line(model, zettel)),
            ContentId::Edl(child) => edl_lines(model, child, indent + 1, lines),
        }
    }

    for sequence in model.root_sequences(id) {
        sequence_lines(model, sequence, indent + 1, lines);
    }
}

fn zettel_line(model: &DocumentModel, id: ZettelId) -> String {
    let zettel = model.zettel(id);
    let mut line = format!("zettel {} {}", zettel.key, zettel.pointer.hashable_name());
    if let Some(text) = zettel.content.as_ref().and_then(|c| c.as_text()) {
        line.push_str(&format!(" {text:?}"));
    }
    let incoming = incoming_labels(model, &zettel.incoming_pointers);
    if !incoming.is_empty() {
        line.push_str(&format!(" <- {}", incoming.join(", ")));
    }
    line.push_str(&markup_suffix(&zettel.markup));
    line
}

fn sequence_lines(model: &DocumentModel, id: SequenceId, indent: usize, lines: &mut Vec<String>) {
    let sequence = model.sequence(id);
    push(
        lines,
        indent,
        format!("sequence {}{}", sequence_label(model, id), markup_suffix(&sequence.markup)),
    );
    for &member in &sequence.members {
        match member {
            SequenceMember::Content(content @ ContentId::Zettel(_)) => {
                push(lines, indent + 1, format!("zettel {}", content_key(model, content)));
            }
            SequenceMember::Content(content @ ContentId::Edl(_)) => {
                push(lines, indent + 1, format!("edl {}", content_key(model, content)));
            }
            SequenceMember::Sequence(inner) => sequence_lines(model, inner, indent + 1, lines),
        }
    }
}
