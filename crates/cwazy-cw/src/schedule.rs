use rand::Rng;

use crate::encode::{encode, is_known, is_word_space, Symbol};
use crate::timing::{Element, Timing};

/// One contiguous tone-on interval on the audio clock, in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvelopeEvent {
    pub start: f64,
    pub end: f64,
}

impl EnvelopeEvent {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Earliest time the next token may start.
///
/// Unset until the first token of a session is scheduled; never moves
/// backwards except through [`ScheduleCursor::reset`] or
/// [`ScheduleCursor::rewind`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScheduleCursor {
    next_start: Option<f64>,
}

impl ScheduleCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_start(&self) -> Option<f64> {
        self.next_start
    }

    pub fn reset(&mut self) {
        self.next_start = None;
    }

    /// Move the cursor back to `next_start`, dropping everything scheduled
    /// after it. Only for tokens that were scheduled but never played.
    pub fn rewind(&mut self, next_start: Option<f64>) {
        self.next_start = next_start;
    }

    /// Start time for a token scheduled at clock time `now`.
    fn begin(&self, now: f64) -> f64 {
        match self.next_start {
            Some(next) => next.max(now),
            None => now,
        }
    }

    fn advance(&mut self, t: f64) {
        self.next_start = Some(match self.next_start {
            Some(next) => next.max(t),
            None => t,
        });
    }
}

/// Schedule one token after everything already queued on `cursor`.
///
/// Tone-on intervals are appended to `events`. A word-space token only moves
/// the cursor by an inter-word gap, and an empty token does nothing. Each
/// character ends with one inter-character gap: the trailing inter-symbol
/// gap of the last element is replaced, not added to.
pub fn schedule_token<R: Rng + ?Sized>(
    token: &str,
    cursor: &mut ScheduleCursor,
    now: f64,
    timing: &Timing,
    rng: &mut R,
    events: &mut Vec<EnvelopeEvent>,
) {
    if token.is_empty() {
        return;
    }

    let mut t = cursor.begin(now);

    if is_word_space(token) {
        t += timing.duration(Element::InterWord, rng);
    } else {
        if !is_known(token) {
            log::trace!("no code for {:?}, sending error signal", token);
        }
        let mut last_gap = 0.0;
        for symbol in encode(token) {
            let length = match symbol {
                Symbol::Dot => timing.duration(Element::Dit, rng),
                Symbol::Dash => timing.duration(Element::Dah, rng),
            };
            let gap = timing.duration(Element::InterSymbol, rng);
            events.push(EnvelopeEvent {
                start: t,
                end: t + length,
            });
            t += length + gap;
            last_gap = gap;
        }
        t += timing.duration(Element::InterCharacter, rng) - last_gap;
    }

    log::trace!("scheduled {:?}, next start {:.6}", token, t);
    cursor.advance(t);
}

/// Schedule a sequence of tokens back to back.
pub fn schedule_tokens<'a, I, R>(
    tokens: I,
    cursor: &mut ScheduleCursor,
    now: f64,
    timing: &Timing,
    rng: &mut R,
) -> Vec<EnvelopeEvent>
where
    I: IntoIterator<Item = &'a str>,
    R: Rng + ?Sized,
{
    let mut events = Vec::new();
    for token in tokens {
        schedule_token(token, cursor, now, timing, rng, &mut events);
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    const EPS: f64 = 1e-9;

    fn classic(wpm: f64) -> Timing {
        Timing::new(wpm, 0.0).expect("timing")
    }

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < EPS, "{a} != {b}");
    }

    fn assert_ordered(events: &[EnvelopeEvent]) {
        for event in events {
            assert!(event.end >= event.start);
        }
        for pair in events.windows(2) {
            assert!(pair[1].start >= pair[0].end, "{:?} overlaps", pair);
        }
    }

    #[test]
    fn sos_matches_reference_timestamps() {
        let timing = classic(20.0);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut cursor = ScheduleCursor::new();
        let now = 10.0;
        let events = schedule_tokens(["S", "O", "S"], &mut cursor, now, &timing, &mut rng);

        let unit = 0.06;
        let mut expected = Vec::new();
        let mut t = now;
        for len in [1.0, 3.0, 1.0] {
            for _ in 0..3 {
                expected.push((t, t + len * unit));
                t += (len + 1.0) * unit;
            }
            t += 2.0 * unit;
        }

        assert_eq!(events.len(), 9);
        for (event, (start, end)) in events.iter().zip(expected) {
            assert_close(event.start, start);
            assert_close(event.end, end);
        }
        // 3 dots, 3 dashes, 3 dots, 6 inter-symbol gaps, 2 inter-character gaps.
        assert_close(events[8].end - events[0].start, 27.0 * unit);
        // Cursor sits one inter-character gap after the final dot.
        assert_close(cursor.next_start().expect("cursor"), events[8].end + 3.0 * unit);
    }

    #[test]
    fn last_symbol_gets_inter_character_gap_only() {
        let timing = classic(20.0);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut cursor = ScheduleCursor::new();
        let events = schedule_tokens(["E", "E"], &mut cursor, 0.0, &timing, &mut rng);
        assert_eq!(events.len(), 2);
        assert_close(events[1].start - events[0].end, 3.0 * 0.06);
    }

    #[test]
    fn word_space_uses_inter_word_gap() {
        let timing = classic(20.0);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut cursor = ScheduleCursor::new();
        let events = schedule_tokens(["E", " ", "E"], &mut cursor, 0.0, &timing, &mut rng);
        assert_eq!(events.len(), 2);
        // Inter-character gap after the first E, then the word space.
        assert_close(events[1].start - events[0].end, 10.0 * 0.06);
    }

    #[test]
    fn word_space_emits_no_tone() {
        let timing = classic(20.0);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut cursor = ScheduleCursor::new();
        let mut events = Vec::new();
        schedule_token(" ", &mut cursor, 2.0, &timing, &mut rng, &mut events);
        assert!(events.is_empty());
        assert_close(cursor.next_start().expect("cursor"), 2.0 + 7.0 * 0.06);
    }

    #[test]
    fn empty_token_leaves_cursor_alone() {
        let timing = classic(20.0);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut cursor = ScheduleCursor::new();
        let mut events = Vec::new();
        schedule_token("", &mut cursor, 2.0, &timing, &mut rng, &mut events);
        assert!(events.is_empty());
        assert_eq!(cursor.next_start(), None);
    }

    #[test]
    fn unknown_token_sends_eight_dots() {
        let timing = classic(20.0);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut cursor = ScheduleCursor::new();
        let events = schedule_tokens(["#"], &mut cursor, 0.0, &timing, &mut rng);
        assert_eq!(events.len(), 8);
        assert!(events.iter().all(|e| (e.duration() - 0.06).abs() < EPS));
    }

    #[test]
    fn successive_calls_chain_instead_of_overlapping() {
        let timing = classic(25.0);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut cursor = ScheduleCursor::new();
        let mut events = Vec::new();
        // The clock barely moves between calls, as with a fast caller.
        for (i, token) in ["S", "O", "S", " ", "S", "O", "S"].iter().enumerate() {
            let now = 1.0 + i as f64 * 0.001;
            schedule_token(token, &mut cursor, now, &timing, &mut rng, &mut events);
        }
        assert_eq!(events.len(), 18);
        assert_ordered(&events);
        assert_close(events[0].start, 1.0);
    }

    #[test]
    fn never_schedules_into_the_past() {
        let timing = classic(20.0);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut cursor = ScheduleCursor::new();
        let first = schedule_tokens(["T"], &mut cursor, 0.0, &timing, &mut rng);
        // The clock has run well past the queued transmission.
        let second = schedule_tokens(["T"], &mut cursor, 50.0, &timing, &mut rng);
        assert_close(first[0].start, 0.0);
        assert_close(second[0].start, 50.0);
    }

    #[test]
    fn jittered_schedule_stays_ordered() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        for jitter in [0.25, 0.5, 1.0] {
            let timing = Timing::new(30.0, jitter).expect("timing");
            let mut cursor = ScheduleCursor::new();
            let mut events = Vec::new();
            let mut previous = None;
            for ch in "THE QUICK BROWN FOX 0123456789 <SK>".chars() {
                let token = ch.to_string();
                schedule_token(&token, &mut cursor, 0.0, &timing, &mut rng, &mut events);
                let next = cursor.next_start();
                assert!(next >= previous);
                previous = next;
            }
            assert_ordered(&events);
        }
    }

    #[test]
    fn rewound_cursor_schedules_from_the_earlier_point() {
        let timing = classic(20.0);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut cursor = ScheduleCursor::new();
        schedule_tokens(["E"], &mut cursor, 0.0, &timing, &mut rng);
        let mark = cursor.next_start();
        schedule_tokens(["O", "O"], &mut cursor, 0.0, &timing, &mut rng);
        cursor.rewind(mark);
        let events = schedule_tokens(["E"], &mut cursor, 0.0, &timing, &mut rng);
        assert_close(events[0].start, 4.0 * 0.06);
    }

    #[test]
    fn reset_cursor_restarts_at_clock() {
        let timing = classic(20.0);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut cursor = ScheduleCursor::new();
        schedule_tokens(["M"; 5], &mut cursor, 0.0, &timing, &mut rng);
        cursor.reset();
        let events = schedule_tokens(["E"], &mut cursor, 0.5, &timing, &mut rng);
        assert_close(events[0].start, 0.5);
    }
}
