//! Text to Morse playback
//!
//! The translator never times anything itself. It walks its buffer one step
//! per [`Translator::poll`] and hands each element or space to a
//! [`KeyingTarget`], advancing only when the target accepts it.

use heapless::Vec;

use crate::fsm::Keyer;
use crate::hal::{OutputSink, PaddleInputs};
use crate::morse;
use crate::types::Element;

/// Longest text line accepted by [`Translator::set_text`]
pub const MAX_TEXT_LEN: usize = 128;

/// What the translator drives; implemented by [`Keyer`]
pub trait KeyingTarget {
    fn is_ready_for_input(&self) -> bool;
    fn trigger_dit(&mut self) -> bool;
    fn trigger_dah(&mut self) -> bool;
    fn send_character_space(&mut self) -> bool;
    fn send_word_space(&mut self) -> bool;
}

impl<P, O> KeyingTarget for Keyer<P, O>
where
    P: PaddleInputs,
    O: OutputSink,
{
    fn is_ready_for_input(&self) -> bool {
        Keyer::is_ready_for_input(self)
    }

    fn trigger_dit(&mut self) -> bool {
        Keyer::trigger_dit(self)
    }

    fn trigger_dah(&mut self) -> bool {
        Keyer::trigger_dah(self)
    }

    fn send_character_space(&mut self) -> bool {
        Keyer::send_character_space(self)
    }

    fn send_word_space(&mut self) -> bool {
        Keyer::send_word_space(self)
    }
}

/// Translator states
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TranslatorState {
    Idle,
    SendingCharacter,
    SendingSymbol,
    EndOfCharacter,
    EndOfWord,
    SendingCharacterSpace,
    SendingWordSpace,
}

/// Why a text line was refused
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SetTextError {
    /// A previous line is still being sent
    Busy,
    /// Nothing to send
    Empty,
    /// Line does not fit the buffer
    TooLong,
    /// Received bytes are not UTF-8
    InvalidText,
}

#[cfg(feature = "std")]
impl core::fmt::Display for SetTextError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            SetTextError::Busy => write!(f, "currently sending, cannot accept a new line"),
            SetTextError::Empty => write!(f, "nothing to send"),
            SetTextError::TooLong => write!(f, "text does not fit the line buffer"),
            SetTextError::InvalidText => write!(f, "text is not valid UTF-8"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for SetTextError {}

pub struct Translator<const N: usize = MAX_TEXT_LEN> {
    text: Vec<char, N>,
    char_index: usize,
    symbol_index: usize,
    pattern: &'static str,
    state: TranslatorState,
    sending: bool,
}

impl<const N: usize> Translator<N> {
    pub const fn new() -> Self {
        Self {
            text: Vec::new(),
            char_index: 0,
            symbol_index: 0,
            pattern: "",
            state: TranslatorState::Idle,
            sending: false,
        }
    }

    /// Queue a line for sending.
    ///
    /// The line is upper-cased. Nothing changes if it is refused.
    pub fn set_text(&mut self, text: &str) -> Result<(), SetTextError> {
        if self.sending {
            #[cfg(feature = "defmt")]
            defmt::warn!("Currently sending, line rejected");
            return Err(SetTextError::Busy);
        }

        let mut upper: Vec<char, N> = Vec::new();
        for c in text.chars().flat_map(char::to_uppercase) {
            upper.push(c).map_err(|_| SetTextError::TooLong)?;
        }
        if upper.is_empty() {
            #[cfg(feature = "defmt")]
            defmt::debug!("Nothing to send");
            return Err(SetTextError::Empty);
        }

        self.text = upper;
        self.char_index = 0;
        self.symbol_index = 0;
        self.pattern = "";
        self.state = TranslatorState::Idle;
        self.sending = true;

        #[cfg(feature = "defmt")]
        defmt::info!("Sending: {} chars", self.text.len());
        Ok(())
    }

    pub fn is_sending(&self) -> bool {
        self.sending
    }

    pub fn state(&self) -> TranslatorState {
        self.state
    }

    /// Characters consumed so far and the line length
    pub fn progress(&self) -> (usize, usize) {
        (self.char_index, self.text.len())
    }

    /// Advance by at most one step
    pub fn poll<K: KeyingTarget>(&mut self, keyer: &mut K) {
        if !self.sending {
            return;
        }

        match self.state {
            TranslatorState::Idle => {
                if self.char_index < self.text.len() {
                    self.state = TranslatorState::SendingCharacter;
                } else {
                    self.finish();
                }
            }

            TranslatorState::SendingCharacter => {
                let c = self.text[self.char_index];
                if c == ' ' {
                    self.state = TranslatorState::EndOfWord;
                    return;
                }
                self.pattern = morse::encode(c);
                if self.pattern.is_empty() {
                    // No Morse form: drop it without a character space
                    #[cfg(feature = "defmt")]
                    defmt::debug!("skipping {}", c as u32);
                    self.char_index += 1;
                    self.state = TranslatorState::Idle;
                } else {
                    self.symbol_index = 0;
                    self.state = TranslatorState::SendingSymbol;
                }
            }

            TranslatorState::SendingSymbol => match self.pattern.as_bytes().get(self.symbol_index) {
                None => {
                    self.symbol_index = 0;
                    self.state = TranslatorState::EndOfCharacter;
                }
                Some(&symbol) => {
                    let accepted = match Element::from_symbol(symbol) {
                        Some(Element::Dit) => keyer.trigger_dit(),
                        Some(Element::Dah) => keyer.trigger_dah(),
                        _ => true,
                    };
                    if accepted {
                        self.symbol_index += 1;
                    }
                }
            },

            TranslatorState::EndOfCharacter => {
                if keyer.send_character_space() {
                    self.state = TranslatorState::SendingCharacterSpace;
                }
            }

            TranslatorState::EndOfWord => {
                if keyer.send_word_space() {
                    self.state = TranslatorState::SendingWordSpace;
                }
            }

            TranslatorState::SendingCharacterSpace | TranslatorState::SendingWordSpace => {
                if keyer.is_ready_for_input() {
                    self.char_index += 1;
                    self.state = TranslatorState::Idle;
                }
            }
        }
    }

    fn finish(&mut self) {
        self.text.clear();
        self.char_index = 0;
        self.symbol_index = 0;
        self.pattern = "";
        self.sending = false;

        #[cfg(feature = "defmt")]
        defmt::info!("Send complete");
    }
}

impl<const N: usize> Default for Translator<N> {
    fn default() -> Self {
        Self::new()
    }
}
