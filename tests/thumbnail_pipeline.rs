mod support;

use support::providers::ScriptedSegments;
use support::signals::{self, RATE};
use support::tracksnip_env::TracksnipEnvGuard;
use support::wav::write_test_wav;

use tracksnip::config::{self, Settings};
use tracksnip::segment::novelty::NoveltySegmenter;
use tracksnip::thumbnail::{Thumbnail, ThumbnailPolicy, TrackAnalyser};
use tracksnip::waveform::{decode, AudioBuffer};

fn pipeline_policy(prelude: f64) -> ThumbnailPolicy {
    ThumbnailPolicy {
        crop_start: 0.0,
        crop_end: 0.0,
        target_length: 2.0,
        prelude,
        ..ThumbnailPolicy::default()
    }
}

#[test]
fn wav_on_disk_is_decoded_and_thumbnailed() {
    let temp = tempfile::tempdir().expect("create tempdir");
    let path = temp.path().join("track.wav");
    let mut samples = signals::tone(500.0, 0.1, 4.0);
    samples.extend(signals::tone(500.0, 0.8, 3.0));
    samples.extend(signals::tone(500.0, 0.4, 3.0));
    write_test_wav(&path, &samples, RATE);

    let audio = decode::load_wav(&path).expect("decode wav");
    assert_eq!(audio.sample_rate(), RATE);
    assert_eq!(audio.len(), samples.len());

    let mut analyser = TrackAnalyser::new(pipeline_policy(0.5));
    analyser.load(audio);
    analyser
        .process_all(ScriptedSegments::boxed(
            vec![(0, 32_000, 0), (32_000, 56_000, 1), (56_000, 80_000, 2)],
            RATE,
        ))
        .expect("process");

    // The loudest span starts at 32 000; half a second of prelude pulls the
    // two-second window back by 4 000 samples.
    assert_eq!(
        analyser.thumbnail().expect("thumbnail"),
        Thumbnail {
            start: 28_000,
            end: 44_000
        }
    );
    assert!((analyser.in_seconds(28_000).expect("seconds") - 3.5).abs() < 1e-9);
}

/// The noise block reads as applause: its flat spectrum drags the smoothed
/// crest factor below the lower threshold once the tonal windows have left
/// the moving average, and the return to tonal audio records the transition
/// back. The middle span sees both transitions and is filtered out.
#[test]
fn applause_heavy_segment_is_passed_over() {
    let mut samples = signals::tone(500.0, 0.4, 5.0);
    samples.extend(signals::noise(0.9, 33.0, 7));
    samples.extend(signals::tone(500.0, 0.5, 8.0));
    let spans = vec![(0, 40_000, 0), (40_000, 352_000, 1), (352_000, 368_000, 2)];

    let mut avoiding = TrackAnalyser::new(pipeline_policy(0.0));
    avoiding.load(AudioBuffer::new(samples.clone(), RATE));
    avoiding
        .process_all(ScriptedSegments::boxed(spans.clone(), RATE))
        .expect("process");
    // The noise span is the loudest but is flagged; the louder of the two
    // tonal spans wins instead.
    assert_eq!(
        avoiding.thumbnail().expect("thumbnail"),
        Thumbnail {
            start: 352_000,
            end: 368_000
        }
    );

    let mut indifferent = TrackAnalyser::new(ThumbnailPolicy {
        avoid_applause: false,
        ..pipeline_policy(0.0)
    });
    indifferent.load(AudioBuffer::new(samples, RATE));
    indifferent
        .process_all(ScriptedSegments::boxed(spans, RATE))
        .expect("process");
    assert_eq!(
        indifferent.thumbnail().expect("thumbnail"),
        Thumbnail {
            start: 40_000,
            end: 56_000
        }
    );
}

#[test]
fn novelty_segmenter_finds_the_loud_section_end_to_end() {
    let mut samples = signals::tone(440.0, 0.2, 10.0);
    samples.extend(signals::tone(1_200.0, 0.8, 10.0));
    let segmenter = NoveltySegmenter::new(RATE).expect("segmenter");

    let mut analyser = TrackAnalyser::new(pipeline_policy(0.0));
    analyser.load(AudioBuffer::new(samples, RATE));
    analyser.process_all(Box::new(segmenter)).expect("process");

    let thumbnail = analyser.thumbnail().expect("thumbnail");
    // The timbre change sits at 80 000 samples; the detected boundary may
    // land within two analysis windows of it.
    assert!(
        thumbnail.start >= 76_800 && thumbnail.start <= 83_200,
        "start {}",
        thumbnail.start
    );
    assert_eq!(thumbnail.len(), 16_000);
    assert!(thumbnail.end <= 160_000);
}

#[test]
fn config_first_run_creates_the_default_file() {
    let temp = tempfile::tempdir().expect("create tempdir");
    let _env = TracksnipEnvGuard::set_config_home(temp.path().to_path_buf());

    let settings = config::load_or_default().expect("first load");
    assert_eq!(settings, Settings::default());

    let path = temp.path().join(".tracksnip").join("config.toml");
    let text = std::fs::read_to_string(&path).expect("config file written");
    assert!(text.contains("thumbnail_length"));

    std::fs::write(&path, "[defaults]\nprelude = 2.5\n").expect("rewrite config");
    let reloaded = config::load_or_default().expect("second load");
    assert_eq!(reloaded.defaults.prelude, 2.5);
    assert_eq!(reloaded.defaults.fade_in, 0.5);
}
