use rand::Rng;
use std::sync::{LazyLock, Mutex};

const ID_CHARS: &[u8; 64] = b"-0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz";

struct IdState {
    last_millis: u64,
    last_rand_chars: [u8; 12],
}

impl IdState {
    fn new() -> Self {
        Self {
            last_millis: 0,
            last_rand_chars: [0; 12],
        }
    }
}

static ID_STATE: LazyLock<Mutex<IdState>> = LazyLock::new(|| Mutex::new(IdState::new()));

/// Generates a 20-character basket document id: an 8-character base-64
/// timestamp prefix (so ids created later sort later) followed by a
/// 12-character random suffix that increments when two ids share a
/// millisecond.
pub(crate) fn next_basket_id(mut now_millis: u64) -> String {
    let mut state = ID_STATE.lock().unwrap();
    let duplicate_time = now_millis == state.last_millis;
    state.last_millis = now_millis;

    let mut timestamp_chars = [0u8; 8];
    for slot in timestamp_chars.iter_mut().rev() {
        let index = (now_millis % 64) as usize;
        now_millis /= 64;
        *slot = ID_CHARS[index];
    }
    debug_assert!(now_millis == 0, "basket id timestamp overflowed base64 encoding");

    if !duplicate_time {
        let mut rng = rand::thread_rng();
        for char_slot in state.last_rand_chars.iter_mut() {
            *char_slot = rng.gen_range(0..64);
        }
    } else {
        let mut index = state.last_rand_chars.len();
        while index > 0 && state.last_rand_chars[index - 1] == 63 {
            state.last_rand_chars[index - 1] = 0;
            index -= 1;
        }
        if index == 0 {
            // Extremely unlikely overflow; the next millisecond tick reseeds
            // the sequence.
            state.last_rand_chars[0] = 0;
        } else {
            state.last_rand_chars[index - 1] += 1;
        }
    }

    let mut id = String::with_capacity(20);
    for ch in &timestamp_chars {
        id.push(*ch as char);
    }
    for &rand_index in &state.last_rand_chars {
        id.push(ID_CHARS[rand_index as usize] as char);
    }

    debug_assert_eq!(id.len(), 20, "basket id should be 20 characters");

    id
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_twenty_characters() {
        let id = next_basket_id(1_700_000_000_000);
        assert_eq!(id.len(), 20);
    }

    #[test]
    fn same_millisecond_ids_differ() {
        let first = next_basket_id(1_700_000_000_001);
        let second = next_basket_id(1_700_000_000_001);
        assert_ne!(first, second);
    }

    #[test]
    fn later_millisecond_sorts_later() {
        let earlier = next_basket_id(1_700_000_000_002);
        let later = next_basket_id(1_700_000_010_002);
        assert!(later > earlier, "timestamp prefix should order ids");
    }
}
