//! Run-length state tracking: each atom's state timeline becomes an ordered
//! list of [`Event`]s.

use ndarray::ArrayView1;

use crate::thread_pool::map_range;
use crate::types::classification::Classification;
use crate::types::event::{Event, EventHistory};

/// Events of one atom, in time order.
///
/// The first event opens as `(s0, s0, s0, 0)`. At every later frame a state
/// change closes the open event with `next` set to the new state and opens
/// `(old current, new, new, 0)`; the open event's duration then grows by one.
/// The event open at the end is kept with `next == current`.
pub fn track_atom(states: ArrayView1<'_, usize>) -> Vec<Event> {
    let mut iter = states.iter().copied();
    let Some(first) = iter.next() else {
        return Vec::new();
    };

    let mut events = Vec::new();
    let mut open = Event::opening(first);
    for state in iter {
        if state != open.current {
            open.next = state;
            events.push(open);
            open = Event::new(open.current, state, state, 0);
        }
        open.duration += 1;
    }
    events.push(open);
    events
}

/// Events of every atom, indexed by atom.
pub fn track_states(classification: &Classification) -> Vec<Vec<Event>> {
    map_range(classification.num_atoms(), |atom| {
        track_atom(classification.atom_states(atom))
    })
}

/// Flatten any event history into one list, atom after atom. A flat list is
/// copied as it is.
pub fn strip_atom_identity<H>(history: &H) -> Vec<Event>
where
    H: EventHistory + ?Sized,
{
    history.iter_events().copied().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn classification(states: Array2<usize>, n_states: usize) -> Classification {
        let legend = (0..n_states).map(|i| format!("state{i}")).collect();
        Classification::from_states(states, legend).unwrap()
    }

    fn fixture() -> Classification {
        classification(
            array![
                [0, 1, 1],
                [0, 2, 2],
                [0, 2, 1],
                [0, 2, 2],
                [0, 2, 1],
                [0, 2, 2]
            ],
            3,
        )
    }

    fn random_classification(seed: u64, frames: usize, atoms: usize, n: usize) -> Classification {
        let mut rng = StdRng::seed_from_u64(seed);
        let states = Array2::from_shape_simple_fn((frames, atoms), || rng.random_range(0..n));
        classification(states, n)
    }

    /// Straightforward restatement of the tracking rules, one frame at a time.
    fn expected_events(states: &[usize]) -> Vec<Event> {
        let mut out = Vec::new();
        let mut event = [states[0], states[0], states[0], 0];
        for &s in &states[1..] {
            if s != event[1] {
                event[2] = s;
                out.push(Event::new(event[0], event[1], event[2], event[3]));
                event = [out[out.len() - 1].current, s, s, 0];
            }
            event[3] += 1;
        }
        out.push(Event::new(event[0], event[1], event[2], event[3]));
        out
    }

    /// Rebuild the state sequence from an atom's events.
    fn replay(events: &[Event]) -> Vec<usize> {
        let mut states = Vec::new();
        for (i, e) in events.iter().enumerate() {
            let span = if i == 0 { e.duration + 1 } else { e.duration };
            states.extend(std::iter::repeat(e.current).take(span));
        }
        states
    }

    #[test]
    fn test_fixture_events() {
        let events = track_states(&fixture());
        assert_eq!(events.len(), 3);
        assert_eq!(events[0], vec![Event::new(0, 0, 0, 5)]);
        assert_eq!(events[1], vec![Event::new(1, 1, 2, 0), Event::new(1, 2, 2, 5)]);
        assert_eq!(
            events[2],
            vec![
                Event::new(1, 1, 2, 0),
                Event::new(1, 2, 1, 1),
                Event::new(2, 1, 2, 1),
                Event::new(1, 2, 1, 1),
                Event::new(2, 1, 2, 1),
                Event::new(1, 2, 2, 1),
            ]
        );
    }

    #[test]
    fn test_random_matches_rules() {
        let data = random_classification(42, 1000, 309, 4);
        let events = track_states(&data);
        assert_eq!(events.len(), 309);
        for (atom, atom_events) in events.iter().enumerate() {
            let states = data.atom_states(atom).to_vec();
            assert_eq!(atom_events, &expected_events(&states));
            assert_eq!(replay(atom_events), states);
        }
    }

    #[test]
    fn test_degenerate_timelines() {
        assert!(track_atom(ndarray::ArrayView1::from(&[] as &[usize])).is_empty());
        assert_eq!(track_atom(array![3].view()), vec![Event::opening(3)]);
    }

    #[test]
    fn test_strip_atom_identity() {
        let events = track_states(&random_classification(7, 50, 12, 3));
        let flat = strip_atom_identity(&events);
        assert_eq!(flat.len(), events.iter().map(Vec::len).sum::<usize>());
        let mut count = 0;
        for atom_events in &events {
            for event in atom_events {
                assert_eq!(*event, flat[count]);
                count += 1;
            }
        }
        assert_eq!(strip_atom_identity(&flat), flat);
    }

    proptest! {
        #[test]
        fn prop_durations_cover_the_window(states in prop::collection::vec(0usize..5, 1..200)) {
            let events = track_atom(ArrayView1::from(&states[..]));
            let total: usize = events.iter().map(|e| e.duration).sum();
            prop_assert_eq!(total, states.len() - 1);
            prop_assert!(events[0].is_first());
            prop_assert!(events[events.len() - 1].is_last());
            prop_assert_eq!(replay(&events), states);
        }
    }
}
