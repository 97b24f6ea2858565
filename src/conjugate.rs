use std::fmt;

/// Surface tense of a matched verb form, carried by terminal rules so an
/// accepted input tense can survive into the display text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tense {
  Past,
  Present,
}

/// Grammatical person-number, imposed downward by a subject rule and
/// consumed by verb conjugation. `ThreePl` additionally names the
/// person-number of plural anaphora ("they").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PersonNumber {
  OneSg,
  ThreeSg,
  Pl,
  ThreePl,
}

impl fmt::Display for PersonNumber {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      Self::OneSg => "oneSg",
      Self::ThreeSg => "threeSg",
      Self::Pl => "pl",
      Self::ThreePl => "threePl",
    };
    write!(f, "{}", s)
  }
}

/// An inflected-form cell name, used by `GramProps::form` to force a
/// specific form regardless of person-number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Form {
  Infinitive,
  Past,
  Gerund,
}

/// Grammatical properties a parent rule imposes on one of its children.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GramProps {
  pub form: Option<Form>,
  pub accepted_tense: Option<Tense>,
}

impl GramProps {
  pub fn form(form: Form) -> Self {
    Self {
      form: Some(form),
      accepted_tense: None,
    }
  }

  pub fn accepted_tense(tense: Tense) -> Self {
    Self {
      form: None,
      accepted_tense: Some(tense),
    }
  }
}

/// The inflected forms of a terminal symbol. Cells are optional; lookups
/// that find no cell at all are grammar bugs and panic in `conjugate_text`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextForms {
  pub infinitive: Option<String>,
  pub past: Option<String>,
  pub gerund: Option<String>,
  pub one_sg: Option<String>,
  pub three_sg: Option<String>,
  pub pl: Option<String>,
}

impl TextForms {
  pub fn new() -> Self {
    Default::default()
  }

  /// The common verb shape: "like"/"likes"/"liked".
  pub fn verb(one_sg: &str, three_sg: &str, past: &str) -> Self {
    Self::new().one_sg(one_sg).three_sg(three_sg).pl(one_sg).past(past)
  }

  pub fn infinitive(mut self, s: &str) -> Self {
    self.infinitive = Some(s.to_string());
    self
  }

  pub fn past(mut self, s: &str) -> Self {
    self.past = Some(s.to_string());
    self
  }

  pub fn gerund(mut self, s: &str) -> Self {
    self.gerund = Some(s.to_string());
    self
  }

  pub fn one_sg(mut self, s: &str) -> Self {
    self.one_sg = Some(s.to_string());
    self
  }

  pub fn three_sg(mut self, s: &str) -> Self {
    self.three_sg = Some(s.to_string());
    self
  }

  pub fn pl(mut self, s: &str) -> Self {
    self.pl = Some(s.to_string());
    self
  }

  fn for_form(&self, form: Form) -> Option<&str> {
    match form {
      Form::Infinitive => self.infinitive.as_deref(),
      Form::Past => self.past.as_deref(),
      Form::Gerund => self.gerund.as_deref(),
    }
  }

  fn for_tense(&self, tense: Tense) -> Option<&str> {
    match tense {
      Tense::Past => self.past.as_deref(),
      Tense::Present => None,
    }
  }

  fn for_person_number(&self, person_number: PersonNumber) -> Option<&str> {
    match person_number {
      PersonNumber::OneSg => self.one_sg.as_deref(),
      PersonNumber::ThreeSg => self.three_sg.as_deref(),
      PersonNumber::Pl | PersonNumber::ThreePl => self.pl.as_deref(),
    }
  }
}

/// Display text attached to a rule: a fixed word sequence, a set of
/// inflected forms, or a sequence of either (the delayed text of an
/// insertion, conjugated only once the first branch has fixed the path's
/// person-number).
#[derive(Debug, Clone, PartialEq)]
pub enum Text {
  Word(String),
  Forms(TextForms),
  Seq(Vec<Text>),
}

impl Text {
  pub fn word(s: &str) -> Self {
    Self::Word(s.to_string())
  }
}

/// Resolves `text` to a display string with a leading space.
///
/// Inflected forms resolve in strict order: a forced grammatical form
/// first, then an accepted input tense, then the person-number in scope.
/// Tense must outrank person-number so "[have] [like]" conjugates to
/// "have liked", never "have likes".
pub fn conjugate_text(
  text: &Text,
  person_number: Option<PersonNumber>,
  gram_props: Option<&GramProps>,
  input_tense: Option<Tense>,
) -> String {
  match text {
    Text::Word(word) => format!(" {}", word),
    Text::Seq(parts) => parts
      .iter()
      .map(|part| conjugate_text(part, person_number, gram_props, input_tense))
      .collect(),
    Text::Forms(forms) => {
      if let Some(props) = gram_props {
        if let Some(form) = props.form {
          if let Some(s) = forms.for_form(form) {
            return format!(" {}", s);
          }
        }
        if let (Some(tense), Some(accepted)) = (input_tense, props.accepted_tense) {
          if tense == accepted {
            if let Some(s) = forms.for_tense(tense) {
              return format!(" {}", s);
            }
          }
        }
      }
      if let Some(person_number) = person_number {
        if let Some(s) = forms.for_person_number(person_number) {
          return format!(" {}", s);
        }
      }
      panic!(
        "no inflection matches {:?} (person-number {:?}, gram-props {:?}, tense {:?})",
        forms, person_number, gram_props, input_tense
      );
    }
  }
}
