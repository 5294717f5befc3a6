use rand::seq::SliceRandom;
use rand::Rng;

use crate::database::word::Word;

/// Shuffles the correct translation together with the distractors.
///
/// Returns the option texts and the position of the correct one. When the
/// correct text occurs more than once the first occurrence wins.
pub fn build_options(correct: &Word, distractors: &[Word]) -> (Vec<String>, usize) {
    build_options_with(correct, distractors, &mut rand::thread_rng())
}

pub fn build_options_with<R: Rng + ?Sized>(
    correct: &Word,
    distractors: &[Word],
    rng: &mut R,
) -> (Vec<String>, usize) {
    let mut options: Vec<String> = std::iter::once(correct.en())
        .chain(distractors.iter().map(Word::en))
        .map(str::to_owned)
        .collect();
    options.shuffle(rng);

    let correct_index = options
        .iter()
        .position(|option| option == correct.en())
        .unwrap_or_default();

    (options, correct_index)
}
