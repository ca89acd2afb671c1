//! Segment tokenizer
//!
//! A lazy, single-pass, non-restartable iterator from raw bytes to segment
//! tokens. The ISA header is positional: its sixteen fields are cut at
//! fixed offsets and also yield the delimiters used for everything that
//! follows. All other segments are delimiter-split (element, then
//! repetition, then component). The tokenizer never interprets element
//! content.

use crate::error::{ErrorKind, StructuralError};
use crate::syntax::{split_all, Frame, SyntaxBuffer};
use crate::Result;
use x12_schema::model::is_segment_id;
use x12_tree::separators::ISA_LENGTH;
use x12_tree::{Position, Separators};

/// Fixed `(offset, length)` of each ISA field, 1-indexed by position
const ISA_FIELDS: [(usize, usize); 16] = [
    (4, 2),
    (7, 10),
    (18, 2),
    (21, 10),
    (32, 2),
    (35, 15),
    (51, 2),
    (54, 15),
    (70, 6),
    (77, 4),
    (82, 1),
    (84, 5),
    (90, 9),
    (100, 1),
    (102, 1),
    (104, 1),
];

/// A tokenized segment
#[derive(Debug, Clone)]
pub struct SegmentTok {
    /// Segment id (2 or 3 uppercase alphanumerics)
    pub id: String,
    /// Element tokens in positional order
    pub elements: Vec<ElementTok>,
    /// Position of the segment in the stream
    pub position: Position,
}

/// A tokenized element
#[derive(Debug, Clone)]
pub enum ElementTok {
    /// Raw characters of a simple element
    Simple(String),
    /// Ordered component character groups of a composite element
    Composite(Vec<String>),
    /// Repetitions; entries are `Simple` or `Composite`
    Repeated(Vec<ElementTok>),
}

impl ElementTok {
    /// Whether the token carries no characters at all.
    pub fn is_blank(&self) -> bool {
        match self {
            ElementTok::Simple(raw) => raw.is_empty(),
            ElementTok::Composite(components) => components.iter().all(String::is_empty),
            ElementTok::Repeated(reps) => reps.iter().all(ElementTok::is_blank),
        }
    }
}

/// Lazy tokenizer over a byte stream
pub struct Tokenizer<'a> {
    buffer: SyntaxBuffer<'a>,
    separators: Separators,
    segment_index: usize,
    pending_isa: Option<SegmentTok>,
}

impl<'a> Tokenizer<'a> {
    /// Read the ISA prefix, derive separators, and prepare iteration.
    ///
    /// Failure to recover separators is fatal: without them there are no
    /// tokens.
    pub fn new(data: &'a [u8]) -> Result<Self> {
        let start = data
            .iter()
            .position(|b| !b" \r\n\t".contains(b))
            .unwrap_or(data.len());
        let separators = Separators::from_isa(&data[start..])?;

        let elements = ISA_FIELDS
            .iter()
            .map(|(offset, length)| {
                let field = &data[start + offset..start + offset + length];
                ElementTok::Simple(String::from_utf8_lossy(field).to_string())
            })
            .collect();
        let isa = SegmentTok {
            id: "ISA".to_string(),
            elements,
            position: Position::new(start, 1),
        };

        let mut buffer = SyntaxBuffer::new(data, separators);
        buffer.seek(start + ISA_LENGTH);

        Ok(Self {
            buffer,
            separators,
            segment_index: 1,
            pending_isa: Some(isa),
        })
    }

    /// The delimiters recovered from the ISA header.
    pub fn separators(&self) -> Separators {
        self.separators
    }

    /// Byte offset the tokenizer has consumed up to.
    pub fn offset(&self) -> usize {
        self.buffer.position()
    }

    /// Ordinal of the most recently produced segment.
    pub fn segment_index(&self) -> usize {
        self.segment_index
    }

    fn tokenize_frame(&self, frame: Frame<'_>) -> std::result::Result<SegmentTok, StructuralError> {
        let position = Position::new(frame.offset, self.segment_index);
        let parts = split_all(frame.bytes, self.separators.element);
        let id = String::from_utf8_lossy(parts[0]).to_string();

        if !is_segment_id(&id) {
            return Err(StructuralError::new(
                ErrorKind::UnknownSegment,
                position,
                format!("malformed segment id '{id}'"),
            ));
        }

        let elements = parts[1..]
            .iter()
            .map(|raw| self.tokenize_element(raw))
            .collect();

        Ok(SegmentTok {
            id,
            elements,
            position,
        })
    }

    fn tokenize_element(&self, raw: &[u8]) -> ElementTok {
        if self.separators.has_repetition() && raw.contains(&self.separators.repetition) {
            let repetitions = split_all(raw, self.separators.repetition)
                .into_iter()
                .map(|rep| self.tokenize_components(rep))
                .collect();
            ElementTok::Repeated(repetitions)
        } else {
            self.tokenize_components(raw)
        }
    }

    fn tokenize_components(&self, raw: &[u8]) -> ElementTok {
        if raw.contains(&self.separators.component) {
            let components = split_all(raw, self.separators.component)
                .into_iter()
                .map(|c| String::from_utf8_lossy(c).to_string())
                .collect();
            ElementTok::Composite(components)
        } else {
            ElementTok::Simple(String::from_utf8_lossy(raw).to_string())
        }
    }
}

impl Iterator for Tokenizer<'_> {
    type Item = std::result::Result<SegmentTok, StructuralError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(isa) = self.pending_isa.take() {
            return Some(Ok(isa));
        }

        let frame = self.buffer.read_frame()?;
        self.segment_index += 1;
        Some(self.tokenize_frame(frame))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ISA: &str = "ISA*00*          *00*          *ZZ*SENDER         *ZZ*RECEIVER       *240101*1200*^*00501*000000001*0*P*:~";

    fn tokens(input: &str) -> Vec<std::result::Result<SegmentTok, StructuralError>> {
        Tokenizer::new(input.as_bytes()).unwrap().collect()
    }

    fn ok_tokens(input: &str) -> Vec<SegmentTok> {
        tokens(input).into_iter().map(|t| t.unwrap()).collect()
    }

    #[test]
    fn test_isa_is_cut_positionally() {
        let toks = ok_tokens(ISA);
        assert_eq!(toks.len(), 1);
        let isa = &toks[0];
        assert_eq!(isa.id, "ISA");
        assert_eq!(isa.elements.len(), 16);
        assert_eq!(isa.position, Position::new(0, 1));

        // ISA11 and ISA16 are data, not split points.
        assert!(matches!(&isa.elements[10], ElementTok::Simple(s) if s == "^"));
        assert!(matches!(&isa.elements[15], ElementTok::Simple(s) if s == ":"));
        assert!(matches!(&isa.elements[5], ElementTok::Simple(s) if s == "SENDER         "));
    }

    #[test]
    fn test_missing_isa_is_fatal() {
        assert!(Tokenizer::new(b"GS*PO~").is_err());
        assert!(Tokenizer::new(b"ISA*00*short").is_err());
    }

    #[test]
    fn test_simple_segments_after_isa() {
        let input = format!("{ISA}GS*PO*SND*RCV~SE*4*0001~");
        let toks = ok_tokens(&input);
        assert_eq!(toks.len(), 3);
        assert_eq!(toks[1].id, "GS");
        assert_eq!(toks[1].elements.len(), 3);
        assert_eq!(toks[1].position.segment, 2);
        assert_eq!(toks[1].position.offset, 106);
        assert_eq!(toks[2].id, "SE");
    }

    #[test]
    fn test_composite_and_empty_elements() {
        let input = format!("{ISA}SLN*1**A:B:C~");
        let toks = ok_tokens(&input);
        let sln = &toks[1];
        assert!(matches!(&sln.elements[0], ElementTok::Simple(s) if s == "1"));
        assert!(matches!(&sln.elements[1], ElementTok::Simple(s) if s.is_empty()));
        match &sln.elements[2] {
            ElementTok::Composite(comps) => assert_eq!(comps, &["A", "B", "C"]),
            other => panic!("expected composite, got {other:?}"),
        }
    }

    #[test]
    fn test_repetition_splitting() {
        let input = format!("{ISA}PER*IC*NAME*TE^FX*5551234~");
        let toks = ok_tokens(&input);
        match &toks[1].elements[2] {
            ElementTok::Repeated(reps) => {
                assert_eq!(reps.len(), 2);
                assert!(matches!(&reps[0], ElementTok::Simple(s) if s == "TE"));
                assert!(matches!(&reps[1], ElementTok::Simple(s) if s == "FX"));
            }
            other => panic!("expected repeated, got {other:?}"),
        }
    }

    #[test]
    fn test_repeated_composites() {
        let input = format!("{ISA}HI*A:1^B:2~");
        let toks = ok_tokens(&input);
        match &toks[1].elements[0] {
            ElementTok::Repeated(reps) => {
                assert!(matches!(&reps[0], ElementTok::Composite(c) if c == &["A", "1"]));
                assert!(matches!(&reps[1], ElementTok::Composite(c) if c == &["B", "2"]));
            }
            other => panic!("expected repeated, got {other:?}"),
        }
    }

    #[test]
    fn test_legacy_repetition_byte_is_data() {
        // 00401-style ISA11 carries 'U'; repetition splitting is disabled.
        let legacy = ISA.replace("*^*", "*U*");
        let input = format!("{legacy}REF*ZZ*VALUE^WITH^CARETS~");
        let toks = ok_tokens(&input);
        assert!(
            matches!(&toks[1].elements[1], ElementTok::Simple(s) if s == "VALUE^WITH^CARETS")
        );
    }

    #[test]
    fn test_unterminated_final_segment_is_emitted() {
        let input = format!("{ISA}IEA*0*000000001");
        let toks = ok_tokens(&input);
        assert_eq!(toks.len(), 2);
        assert_eq!(toks[1].id, "IEA");
        assert_eq!(toks[1].elements.len(), 2);
    }

    #[test]
    fn test_whitespace_between_segments_ignored() {
        let input = format!("{ISA}\r\nGS*PO~\n  GE*1~");
        let toks = ok_tokens(&input);
        assert_eq!(toks.len(), 3);
        assert_eq!(toks[2].id, "GE");
    }

    #[test]
    fn test_malformed_id_is_flagged_not_fatal() {
        let input = format!("{ISA}xx*1~GE*1~");
        let toks = tokens(&input);
        assert_eq!(toks.len(), 3);
        let err = toks[1].as_ref().unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnknownSegment);
        assert_eq!(err.position.segment, 2);
        // Iteration continues past the flagged segment.
        assert_eq!(toks[2].as_ref().unwrap().id, "GE");
    }

    #[test]
    fn test_blank_detection() {
        assert!(ElementTok::Simple(String::new()).is_blank());
        assert!(ElementTok::Composite(vec![String::new(), String::new()]).is_blank());
        assert!(!ElementTok::Simple("x".to_string()).is_blank());
    }
}
