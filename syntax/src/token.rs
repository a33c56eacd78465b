use std::fmt;

/// Read access to the vertex attributes the pattern sub-language can test.
///
/// The matching core stays generic over the payload type; this trait is
/// the only thing the compiled predicates know about it.
pub trait Attributed {
    fn text(&self) -> &str;
    fn lemma(&self) -> &str;
    fn pos(&self) -> &str;
    fn chunk(&self) -> &str;
}

/// A fully annotated token: surface form, lemma, part-of-speech tag and
/// chunk tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LemmatizedToken {
    pub text: String,
    pub lemma: String,
    pub pos: String,
    pub chunk: String,
}

impl LemmatizedToken {
    pub fn new(
        text: impl Into<String>,
        lemma: impl Into<String>,
        pos: impl Into<String>,
        chunk: impl Into<String>,
    ) -> Self {
        LemmatizedToken {
            text: text.into(),
            lemma: lemma.into(),
            pos: pos.into(),
            chunk: chunk.into(),
        }
    }
}

impl Attributed for LemmatizedToken {
    fn text(&self) -> &str {
        &self.text
    }

    fn lemma(&self) -> &str {
        &self.lemma
    }

    fn pos(&self) -> &str {
        &self.pos
    }

    fn chunk(&self) -> &str {
        &self.chunk
    }
}

impl fmt::Display for LemmatizedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}
