extern crate libtest_mimic;

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use libtest_mimic::{Arguments, Failed, Trial};
use yamfold_core::{fold_str, EncodeOptions};
use yamfold_test_bench::{check_round_trip, event_text};

const FIXTURE_COUNT: usize = 16;

/// Files of one fixture directory. Every expected file is optional.
#[derive(Default)]
struct TestData {
    desc: String,
    input_yaml: PathBuf,
    /// Normalized output, aliases preserved.
    output_yaml: Option<PathBuf>,
    /// Normalized output, aliases resolved.
    resolved_yaml: Option<PathBuf>,
    /// Output in keep-style mode, aliases preserved.
    keep_yaml: Option<PathBuf>,
    /// Events in keep-style mode, aliases preserved.
    test_event: Option<PathBuf>,
    /// Part of the error message expected when resolving aliases.
    error: Option<PathBuf>,
}

fn check_output(input: &str, expected_path: &Path, options: EncodeOptions) -> Result<(), Failed> {
    let expected = fs::read_to_string(expected_path)?;
    let actual = fold_str(input, options)?;
    if actual != expected {
        return Err(format!(
            "{} differs\n--- expected\n{expected}--- actual\n{actual}",
            expected_path.display()
        )
        .into());
    }
    check_round_trip(input, &actual, options.aliases)?;
    Ok(())
}

fn perform_test(data: TestData) -> Result<(), Failed> {
    let input = fs::read_to_string(&data.input_yaml)?;
    let normalize = EncodeOptions::default();

    if let Some(path) = &data.output_yaml {
        check_output(&input, path, normalize)?;
    }
    if let Some(path) = &data.keep_yaml {
        check_output(&input, path, normalize.keep_style())?;
    }
    if let Some(path) = &data.resolved_yaml {
        check_output(&input, path, normalize.resolve_aliases())?;
    }
    if let Some(path) = &data.test_event {
        let expected = fs::read_to_string(path)?;
        let actual = event_text(&input, normalize.keep_style())?;
        if actual != expected {
            return Err(format!("events differ\n--- expected\n{expected}--- actual\n{actual}").into());
        }
    }
    if let Some(path) = &data.error {
        let expected = fs::read_to_string(path)?;
        match fold_str(&input, normalize.resolve_aliases()) {
            Ok(out) => return Err(format!("expected an error, got\n{out}").into()),
            Err(err) => {
                let message = err.to_string();
                if !message.contains(expected.trim()) {
                    return Err(format!("expected `{}`, got `{message}`", expected.trim()).into());
                }
            }
        }
    }
    Ok(())
}

fn collect_test(
    dir_name: String,
    test_dir_path: &Path,
    tests: &mut Vec<Trial>,
) -> Result<(), Box<dyn Error>> {
    let mut test_data = TestData::default();
    for entry in fs::read_dir(test_dir_path)? {
        let entry = entry?;
        let filename = entry
            .file_name()
            .into_string()
            .map_err(|name| format!("non-UTF8 file name {name:?}"))?;
        match &*filename {
            "===" => {
                if let Ok(desc) = fs::read_to_string(entry.path()) {
                    test_data.desc = String::from(desc.trim());
                }
            }
            "in.yaml" => test_data.input_yaml = entry.path(),
            "out.yaml" => test_data.output_yaml = Some(entry.path()),
            "resolved.yaml" => test_data.resolved_yaml = Some(entry.path()),
            "keep.yaml" => test_data.keep_yaml = Some(entry.path()),
            "test.event" => test_data.test_event = Some(entry.path()),
            "error" => test_data.error = Some(entry.path()),
            _ => {}
        };
    }
    let name = format!("{dir_name} ({})", test_data.desc);
    tests.push(Trial::test(name, move || perform_test(test_data)));
    Ok(())
}

fn collect_tests(path: &Path) -> Result<Vec<Trial>, Box<dyn Error>> {
    let mut tests = Vec::with_capacity(FIXTURE_COUNT);
    for entry in fs::read_dir(path)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            let dir_name = entry
                .file_name()
                .into_string()
                .map_err(|name| format!("non-UTF8 directory name {name:?}"))?;
            collect_test(dir_name, &entry.path(), &mut tests)?;
        }
    }
    Ok(tests)
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Arguments::from_args();

    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");

    let tests = collect_tests(&path)?;
    libtest_mimic::run(&args, tests).exit();
}
