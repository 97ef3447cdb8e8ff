use std::io::Cursor;
use std::path::PathBuf;

use easel_core::naming::{mode_prefix, output_file_name};
use easel_core::presets::{configure_image, configure_video};
use easel_core::{ChoiceMenu, Configurator, GenerationError, MediaSpec, Precision};
use rstest::rstest;

fn scripted(input: &str) -> Configurator<Cursor<Vec<u8>>, Vec<u8>> {
    Configurator::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
}

#[rstest]
#[case("", "Fast")]
#[case("2", "Slow")]
#[case("abc\n1", "Fast")]
#[case("9\n\n", "Fast")]
fn menu_answers(#[case] input: &str, #[case] expected: &str) {
    let menu = ChoiceMenu::new([("Fast", "Fast"), ("Slow", "Slow")], 0).unwrap();
    let mut cfg = scripted(&format!("{input}\n"));
    assert_eq!(cfg.ask("Select generation mode:", &menu).unwrap(), expected);
}

#[rstest]
#[case("stabilityai/sdxl-turbo", "fast")]
#[case("stabilityai/SDXL-Turbo", "fast")]
#[case("stabilityai/stable-diffusion-xl-base-1.0", "slow")]
#[case("THUDM/CogVideoX-2b", "cogvideo-2b")]
#[case("THUDM/CogVideoX-5b", "cogvideo-5b")]
#[case("black-forest-labs/FLUX.1-schnell", "flux-schnell")]
#[case("black-forest-labs/FLUX.1-dev", "flux-dev")]
fn prefixes(#[case] model_id: &str, #[case] prefix: &str) {
    assert_eq!(mode_prefix(model_id), prefix);
}

#[test]
fn file_name_is_prefix_timestamp_extension() {
    assert_eq!(
        output_file_name("stabilityai/sdxl-turbo", "20240101_120000", "png"),
        "fast_20240101_120000.png"
    );
    assert_eq!(
        output_file_name("THUDM/CogVideoX-2b", "20240101_120000", "mp4"),
        "cogvideo-2b_20240101_120000.mp4"
    );
}

#[test]
fn image_defaults_pick_turbo() {
    let mut cfg = scripted("\n\n\n  a lighthouse at dusk \n");
    let request = configure_image(&mut cfg, PathBuf::from("images")).unwrap();

    assert_eq!(request.model_id, "stabilityai/sdxl-turbo");
    assert_eq!(request.model_name, "SDXL-Turbo");
    assert_eq!(request.steps, 4);
    assert_eq!(request.guidance, Some(0.0));
    assert_eq!(
        request.media,
        MediaSpec::Image {
            width: 512,
            height: 512
        }
    );
    assert_eq!(request.precision, Precision::F16);
    assert_eq!(request.prompt, "a lighthouse at dusk");
    assert_eq!(request.output_dir, PathBuf::from("images"));
    assert!(request.validate().is_ok());
}

#[test]
fn slow_mode_offers_its_own_steps() {
    let mut cfg = scripted("2\n3\n2\na castle\n");
    let request = configure_image(&mut cfg, PathBuf::from("images")).unwrap();

    assert_eq!(request.model_id, "stabilityai/stable-diffusion-xl-base-1.0");
    assert_eq!(request.steps, 50);
    assert_eq!(request.guidance, Some(7.5));
    assert_eq!(
        request.media,
        MediaSpec::Image {
            width: 1024,
            height: 1024
        }
    );

    let shown = String::from_utf8(cfg.into_output()).unwrap();
    assert!(shown.contains("  1. 20 (default)"));
    assert!(shown.contains("  3. 50"));
}

#[test]
fn video_defaults() {
    let mut cfg = scripted("\n\n\nA cat walks on the grass\n");
    let request = configure_video(&mut cfg, PathBuf::from("videos")).unwrap();

    assert_eq!(request.model_id, "THUDM/CogVideoX-2b");
    assert_eq!(request.steps, 50);
    assert_eq!(request.media, MediaSpec::Video { frames: 24, fps: 8 });
    assert_eq!(request.guidance, Some(6.0));
    assert_eq!(request.seed, Some(42));
    assert_eq!(request.media.duration_secs(), Some(3.0));
}

#[test]
fn video_long_high_quality() {
    let mut cfg = scripted("2\n3\n2\nwaves at night\n");
    let request = configure_video(&mut cfg, PathBuf::from("videos")).unwrap();

    assert_eq!(request.model_id, "THUDM/CogVideoX-5b");
    assert_eq!(request.steps, 80);
    assert_eq!(request.media, MediaSpec::Video { frames: 49, fps: 8 });
}

#[test]
fn empty_prompt_ends_configuration() {
    let mut cfg = scripted("\n\n\n   \n");
    assert!(matches!(
        configure_image(&mut cfg, PathBuf::from("images")),
        Err(GenerationError::EmptyPrompt)
    ));
}
