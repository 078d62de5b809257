use proptest::prelude::*;

use crate::display::address::pixel_offset;
use crate::display::{FrameCache, RamMedium, Source, SourceId};
use crate::display::BitOp;

const RAW_WIDTH: usize = 128;
const RAW_HEIGHT: usize = 64;
const FRAME: usize = RAW_WIDTH * RAW_HEIGHT / 8;

fn cache(line_size: usize) -> (FrameCache, crate::display::RamMediumHandle) {
    let medium = RamMedium::new(FRAME);
    let handle = medium.handle();
    let mut cache = FrameCache::new(Some(Box::new(medium)), RAW_WIDTH, RAW_HEIGHT, line_size).unwrap();
    cache.register_source(Source::external(SourceId::Draw, 0)).unwrap();
    cache
        .register_source(Source::constant(SourceId::Splash, vec![0xA5; FRAME]))
        .unwrap();
    cache.select_source(SourceId::Draw).unwrap();
    (cache, handle)
}

fn line_sizes() -> impl Strategy<Value = usize> {
    prop_oneof![Just(16usize), Just(64), Just(128), Just(1024)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn writes_survive_a_source_round_trip(
        line_size in line_sizes(),
        first in (0..RAW_WIDTH, 0..RAW_HEIGHT, any::<u8>()),
        second in (0..RAW_WIDTH, 0..RAW_HEIGHT, any::<u8>()),
    ) {
        let (mut cache, handle) = cache(line_size);
        let (x0, y0, v0) = first;
        let (x1, y1, v1) = second;

        *cache.pixel_byte_mut(x0, y0).unwrap() = v0;
        *cache.pixel_byte_mut(x1, y1).unwrap() = v1;
        let mut expected = vec![0u8; FRAME];
        expected[pixel_offset(x0, y0, RAW_WIDTH)] = v0;
        expected[pixel_offset(x1, y1, RAW_WIDTH)] = v1;

        cache.select_source(SourceId::Splash).unwrap();
        prop_assert_eq!(cache.pixel_byte(x0, y0).unwrap(), 0xA5);
        // leaving the draw source wrote everything back
        prop_assert_eq!(handle.snapshot(0, FRAME), expected.clone());

        cache.select_source(SourceId::Draw).unwrap();
        prop_assert!(!cache.line().is_initialized());
        for offset in 0..FRAME {
            let x = offset % RAW_WIDTH;
            let y = (offset / RAW_WIDTH) * 8;
            prop_assert_eq!(cache.pixel_byte(x, y).unwrap(), expected[offset]);
        }
    }

    #[test]
    fn bit_operations_match_a_plain_buffer(
        line_size in line_sizes(),
        ops in prop::collection::vec(
            (0..RAW_WIDTH, 0..RAW_HEIGHT, 0u8..3, any::<u8>()),
            1..40,
        ),
    ) {
        let (mut cache, handle) = cache(line_size);
        let mut model = vec![0u8; FRAME];

        for &(x, y, op, mask) in &ops {
            let op = match op {
                0 => BitOp::Set,
                1 => BitOp::Clear,
                _ => BitOp::Toggle,
            };
            cache.bit_operation(x, y, op, mask).unwrap();
            let offset = pixel_offset(x, y, RAW_WIDTH);
            model[offset] = op.apply(model[offset], mask);
        }

        cache.flush_line().unwrap();
        prop_assert!(!cache.line().is_dirty());
        prop_assert_eq!(handle.snapshot(0, FRAME), model);
    }
}
