use std::path::PathBuf;

use indicatif::ProgressStyle;

pub fn pb_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("  {msg:<24} [{wide_bar}] {pos}/{len} [{elapsed_precise}<{eta_precise}]")
        .expect("failed to build progress style")
        .progress_chars("=> ")
}

/// 解析 `NAME=DIR` 形式的人员参数
pub fn parse_person(s: &str) -> Result<(String, PathBuf), String> {
    match s.split_once('=') {
        Some((name, dir)) if !name.trim().is_empty() && !dir.is_empty() => {
            Ok((name.trim().to_owned(), PathBuf::from(dir)))
        }
        _ => Err(format!("无效的人员参数，应为 NAME=DIR: {}", s)),
    }
}

/// 只保留纯字母数字的扩展名，其余情况按 jpg 处理
pub fn sanitize_extension(ext: Option<&str>) -> &str {
    match ext {
        Some(ext) if !ext.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric()) => ext,
        _ => "jpg",
    }
}
