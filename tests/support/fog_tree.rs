use std::fmt::Write as _;
use std::fs;
use std::path::Path;

pub const TDCSFOG_TEST_ROWS: usize = 5;
pub const DEFOG_TEST_ROWS: usize = 7;

/// Class a synthetic row belongs to: high `AccV` walks, high `AccML` turns.
fn indicators(acc_v: f64, acc_ml: f64) -> (u8, u8, u8) {
    if acc_ml > 1.0 {
        (0, 1, 0)
    } else if acc_v > 0.0 {
        (0, 0, 1)
    } else {
        (0, 0, 0)
    }
}

fn sensor(row: usize, seed: usize) -> (f64, f64, f64) {
    let acc_v = if (row + seed) % 3 == 0 { 1.5 } else { -0.5 };
    let acc_ml = if (row + seed) % 5 == 0 { 2.0 } else { 0.25 };
    (acc_v, acc_ml, 0.1 * (row % 4) as f64)
}

fn write(path: &Path, text: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, text).unwrap();
}

fn defog_recording(seed: usize, rows: usize) -> String {
    let mut text = String::from("Time,AccV,AccML,AccAP,StartHesitation,Turn,Walking,Valid,Task\n");
    for row in 0..rows {
        let (v, ml, ap) = sensor(row, seed);
        let (sh, turn, walk) = indicators(v, ml);
        let valid = if row % 10 == 9 { "False" } else { "True" };
        let task = if row % 11 == 10 { "False" } else { "True" };
        let _ = writeln!(text, "{row},{v},{ml},{ap},{sh},{turn},{walk},{valid},{task}");
    }
    text
}

fn tdcsfog_recording(seed: usize, rows: usize) -> String {
    let mut text = String::from("Time,AccV,AccML,AccAP,StartHesitation,Turn,Walking\n");
    for row in 0..rows {
        let (v, ml, ap) = sensor(row, seed);
        let (_, turn, walk) = indicators(v, ml);
        let sh = u8::from(row == 0);
        let _ = writeln!(text, "{row},{v},{ml},{ap},{sh},{turn},{walk}");
    }
    text
}

fn test_recording(seed: usize, rows: usize) -> String {
    let mut text = String::from("Time,AccV,AccML,AccAP\n");
    for row in 0..rows {
        let (v, ml, ap) = sensor(row, seed);
        let _ = writeln!(text, "{row},{v},{ml},{ap}");
    }
    text
}

/// Lay out a miniature copy of the competition data under `root`.
pub fn write_fog_tree(root: &Path) {
    write(&root.join("train/defog/d1.csv"), &defog_recording(0, 60));
    write(&root.join("train/defog/d2.csv"), &defog_recording(1, 45));
    write(
        &root.join("defog_metadata.csv"),
        "Id,Subject,Visit,Medication\nd1,a1,2,on\nd2,a2,1,off\nunused,a3,1,on\n",
    );
    write(&root.join("train/tdcsfog/t1.csv"), &tdcsfog_recording(2, 30));
    write(
        &root.join("train/tdcsfog/nested/t2.csv"),
        &tdcsfog_recording(3, 25),
    );
    write(
        &root.join("tdcsfog_metadata.csv"),
        "Id,Subject,Visit,Test,Medication\nt1,b1,1,2,on\nt2,b2,2,1,off\n",
    );
    write(
        &root.join("test/tdcsfog/003f117e14.csv"),
        &test_recording(4, TDCSFOG_TEST_ROWS),
    );
    write(
        &root.join("test/defog/02ab235146.csv"),
        &test_recording(5, DEFOG_TEST_ROWS),
    );
    write(
        &root.join("sample_submission.csv"),
        "Id,StartHesitation,Turn,Walking\n003f117e14_0,0,0,0\n",
    );
}
