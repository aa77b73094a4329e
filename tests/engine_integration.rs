//! End-to-end exercises of the public API: build an in-memory soundfont,
//! load it, play and release notes, and render audio through the full
//! preset/instrument/zone → voice → mixer pipeline.

use sf2engine::engine::{Engine, EngineConfig};
use sf2engine::generator::{Amount, Index};
use sf2engine::sample::SampleType;
use sf2engine::soundfont::{RawInstrument, RawPreset, RawZone, SoundFontData};

/// Tests run concurrently and share one global logger, so ignore the
/// "already initialized" error rather than letting it fail the suite.
fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn sample_header() -> sf2engine::sample::SampleHeader {
    sf2engine::sample::SampleHeader {
        start: 0,
        end: 2000,
        start_loop: 200,
        end_loop: 1800,
        sample_rate: 44100,
        original_midi_key: 60,
        pitch_correction: 0,
        sample_type: SampleType::Mono,
    }
}

/// A two-octave split instrument/preset: low notes use sample 0, high notes
/// use sample 1, mirroring the key-range layering a real SF2 uses for
/// multi-sample instruments.
fn split_soundfont() -> SoundFontData {
    let low_instrument = RawInstrument {
        name: "Low".to_string(),
        zones: vec![RawZone {
            generators: vec![(Index::SampleId, Amount::new(0))],
            modulators: Vec::new(),
        }],
    };
    let high_instrument = RawInstrument {
        name: "High".to_string(),
        zones: vec![RawZone {
            generators: vec![(Index::SampleId, Amount::new(1))],
            modulators: Vec::new(),
        }],
    };
    let preset = RawPreset {
        name: "Split".to_string(),
        bank: 0,
        program: 0,
        zones: vec![
            RawZone {
                generators: vec![
                    (Index::KeyRange, Amount::new(0 | (59 << 8))),
                    (Index::Instrument, Amount::new(0)),
                ],
                modulators: Vec::new(),
            },
            RawZone {
                generators: vec![
                    (Index::KeyRange, Amount::new(60 | (127 << 8))),
                    (Index::Instrument, Amount::new(1)),
                ],
                modulators: Vec::new(),
            },
        ],
    };
    SoundFontData::new()
        .with_preset(preset)
        .with_instrument(low_instrument)
        .with_instrument(high_instrument)
        .with_sample(sample_header())
        .with_sample(sample_header())
        .with_pcm(vec![12000; 2000])
}

#[test]
fn key_split_routes_to_the_matching_instrument_sample() {
    init_logging();
    let data = split_soundfont();
    let mut engine = Engine::new(EngineConfig { voice_pool_size: 8, max_frames_to_render: 512, sample_rate: 44100.0 });
    engine.load(&data, 0).unwrap();

    engine.note_on(40, 100);
    assert_eq!(engine.active_voice_count(), 1);
    engine.all_off();

    engine.note_on(90, 100);
    assert_eq!(engine.active_voice_count(), 1);
    engine.all_off();
}

#[test]
fn render_produces_nonzero_audio_then_silence_after_release_and_decay() {
    let data = split_soundfont();
    let mut engine = Engine::new(EngineConfig { voice_pool_size: 8, max_frames_to_render: 512, sample_rate: 44100.0 });
    engine.load(&data, 0).unwrap();
    engine.note_on(60, 127);

    let mut left = vec![0.0f32; 256];
    let mut right = vec![0.0f32; 256];
    engine.render(256, (&mut left, &mut right), None, None);
    assert!(left.iter().any(|&s| s != 0.0), "expected audible output while the note is held");

    engine.note_off(60);
    // A long release should eventually drain the voice even without
    // explicit `all_off`, via the noise-floor cutoff in the render cycle.
    for _ in 0..200 {
        engine.render(256, (&mut left, &mut right), None, None);
        if engine.active_voice_count() == 0 {
            break;
        }
    }
    assert_eq!(engine.active_voice_count(), 0);
}

#[test]
fn all_off_then_render_is_exact_silence_on_every_bus() {
    let data = split_soundfont();
    let mut engine = Engine::new(EngineConfig { voice_pool_size: 8, max_frames_to_render: 512, sample_rate: 44100.0 });
    engine.load(&data, 0).unwrap();
    engine.note_on(60, 100);
    engine.all_off();

    let mut dry_l = vec![1.0f32; 64];
    let mut dry_r = vec![1.0f32; 64];
    let mut chorus_l = vec![1.0f32; 64];
    let mut chorus_r = vec![1.0f32; 64];
    let mut reverb_l = vec![1.0f32; 64];
    let mut reverb_r = vec![1.0f32; 64];
    engine.render(
        64,
        (&mut dry_l, &mut dry_r),
        Some((&mut chorus_l, &mut chorus_r)),
        Some((&mut reverb_l, &mut reverb_r)),
    );

    for buf in [&dry_l, &dry_r, &chorus_l, &chorus_r, &reverb_l, &reverb_r] {
        assert!(buf.iter().all(|&s| s == 0.0));
    }
}

#[test]
fn cc_driven_program_change_selects_preset_by_bank_and_program() {
    let data = split_soundfont();
    let mut engine = Engine::new(EngineConfig::default());
    engine.load(&data, 0).unwrap();

    // Bank select MSB/LSB = 0, program change 0 should re-select the same
    // (and only) preset rather than silencing the engine.
    engine.handle_midi(&[0xb0, 0, 0]);
    engine.handle_midi(&[0xb0, 32, 0]);
    engine.handle_midi(&[0xc0, 0]);
    assert!(engine.has_active_preset());

    engine.handle_midi(&[0x90, 60, 100]);
    assert_eq!(engine.active_voice_count(), 1);
}

#[test]
fn sysex_payload_round_trips_through_base64() {
    let path = "/library/soundfonts/example.sf2";
    use base64::Engine as _;
    let encoded = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(path.as_bytes());
    let decoded = sf2engine::engine::decode_sysex_path(encoded.as_bytes()).unwrap();
    assert_eq!(decoded, path);
}

#[test]
fn load_with_duplicate_bank_program_is_rejected_and_engine_stays_silent() {
    let mut preset_a = RawPreset { name: "A".to_string(), bank: 0, program: 0, zones: Vec::new() };
    let mut preset_b = RawPreset { name: "B".to_string(), bank: 0, program: 0, zones: Vec::new() };
    preset_a.zones.push(RawZone { generators: vec![(Index::Instrument, Amount::new(0))], modulators: Vec::new() });
    preset_b.zones.push(RawZone { generators: vec![(Index::Instrument, Amount::new(0))], modulators: Vec::new() });
    let data = SoundFontData::new().with_preset(preset_a).with_preset(preset_b);

    let mut engine = Engine::new(EngineConfig::default());
    let result = engine.load(&data, 0);
    assert!(result.is_err());
    assert!(!engine.has_active_preset());
    engine.note_on(60, 100);
    assert_eq!(engine.active_voice_count(), 0);
}
