/// Maps a cumulative score to its bucket index. Indices sort in score order.
///
/// | Range      | Index |
/// |------------|-------|
/// | <= -20     | 0     |
/// | -19..=-15  | 1     |
/// | -14..=-10  | 2     |
/// | -9..=-5    | 3     |
/// | -4..=0     | 4     |
/// | 1..=5      | 5     |
/// | 6..=10     | 6     |
/// | ...        | +1 per width-5 step |
pub fn bucket_index(score: i64) -> usize {
    match score {
        s if s <= -20 => 0,
        -19..=-15 => 1,
        -14..=-10 => 2,
        -9..=-5 => 3,
        -4..=0 => 4,
        s => 5 + ((s - 1) / 5) as usize,
    }
}

pub fn bucket_label(index: usize) -> String {
    match index {
        0 => "≤-20".into(),
        1 => "-19..-15".into(),
        2 => "-14..-10".into(),
        3 => "-9..-5".into(),
        4 => "-4..0".into(),
        n => {
            let low = (n - 5) * 5 + 1;
            format!("{}..{}", low, low + 4)
        }
    }
}
