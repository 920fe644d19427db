#![no_main]

use klanginsel::sequencer::Sequencer;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut sequencer = Sequencer::with_seed(data.len() as u64);
    let mut count = (data.first().copied().unwrap_or(0) % 16) as usize;
    let mut shuffle = false;
    let mut current = 0usize;

    for byte in data {
        let step = match byte % 6 {
            0 => sequencer.next(current, count, shuffle),
            1 => sequencer.previous(current, count, shuffle),
            2 => {
                shuffle = !shuffle;
                sequencer.on_shuffle_toggle(shuffle, count)
            }
            3 => {
                let index = (*byte as usize / 6) % count.max(1);
                if shuffle {
                    sequencer.on_manual_select(index);
                }
                Some(index)
            }
            4 => {
                count = (*byte as usize) % 16;
                sequencer.on_track_count_change(count, shuffle);
                None
            }
            _ => {
                sequencer.clear();
                None
            }
        };

        if let Some(index) = step {
            current = index;
        }
        if count > 0 {
            assert!(current < count || step.is_none());
        }
        if let Some(cursor) = sequencer.cursor() {
            assert!(cursor < sequencer.order().len());
        }
    }
});
