use std::path::{Path, PathBuf};

use anyhow::bail;
use audiotags::{MimeType, Picture, Tag};
use log::{error, info, warn};
use music_unboxing::{sniff, Codec, DecryptError, EmbeddedMetadata};
use tokio::fs;
use tokio::io::AsyncReadExt;

pub async fn apply(input: String, output: Option<String>) {
    if let Err(error) = unboxing(input, output).await {
        error!("{:#}", error);
        std::process::exit(1);
    }
}

pub async fn probe(input: String, prefix_bytes: usize) {
    if let Err(error) = probe_head(input, prefix_bytes).await {
        error!("{:#}", error);
        std::process::exit(1);
    }
}

async fn pre_opt(input: String, output: Option<String>) -> anyhow::Result<(PathBuf, PathBuf)> {
    let input = PathBuf::from(input);

    if !fs::try_exists(&input).await? {
        bail!("input: {:?} does not exist", input);
    }

    if input.is_dir() {
        bail!("input: {:?} is a directory", input);
    }

    if !music_unboxing::detect(&file_name(&input)).is_encrypted() {
        bail!("input: {:?} is not an encrypted container", input);
    }

    let output = match output {
        Some(output) => PathBuf::from(output),
        None => input
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".")),
    };

    if output.is_file() {
        bail!("output: {:?} is a file", output);
    }

    fs::create_dir_all(&output).await?;

    Ok((input, output))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// `title - artist` when the container carries both, else the input stem.
fn output_stem(input: &Path, meta: &EmbeddedMetadata) -> String {
    let stem = match (&meta.title, meta.artist()) {
        (Some(title), Some(artist)) => format!("{} - {}", title, artist),
        _ => input
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output".to_string()),
    };
    stem.replace(['/', '\\', ':', '*', '?', '"', '<', '>', '|'], "_")
}

async fn unboxing(input: String, output: Option<String>) -> anyhow::Result<()> {
    let (input, output) = pre_opt(input, output).await?;

    let buffer = fs::read(&input).await?;

    let audio = music_unboxing::decrypt(&file_name(&input), &buffer)?;
    drop(buffer);

    let stem = output_stem(&input, &audio.metadata);
    let target = output.join(format!("{}.{}", stem, audio.codec().extension()));
    fs::write(&target, &audio.data).await?;
    info!("{:?} -> {:?} ({})", input, target, audio.mime());

    if let Some(cover) = &audio.metadata.cover {
        let ext = match sniff::image_mime(cover) {
            Some("image/png") => "png",
            _ => "jpg",
        };
        fs::write(output.join(format!("{}.{}", stem, ext)), cover).await?;
    }

    if audio.codec() == Codec::Ogg || audio.metadata.is_empty() {
        return Ok(());
    }

    let meta = audio.metadata;
    let tagged = target.clone();
    let result = tokio::task::spawn_blocking(move || combine_file(&meta, &tagged)).await?;
    if let Err(error) = result {
        warn!("could not tag {:?}: {:#}", target, error);
    }

    Ok(())
}

fn combine_file(meta: &EmbeddedMetadata, output: &Path) -> anyhow::Result<()> {
    let mut tag = Tag::new().read_from_path(output)?;

    if let Some(title) = &meta.title {
        tag.set_title(title);
    }

    if let Some(album) = &meta.album {
        tag.set_album_title(album);
    }

    meta.artists.iter().for_each(|artist| tag.add_artist(artist));

    if let Some(cover) = &meta.cover {
        let mime_type = match sniff::image_mime(cover) {
            Some("image/png") => MimeType::Png,
            _ => MimeType::Jpeg,
        };
        tag.set_album_cover(Picture {
            mime_type,
            data: cover.as_slice(),
        });
    }

    tag.write_to_path(
        output
            .to_str()
            .ok_or(anyhow::Error::msg("output path error"))?,
    )?;

    Ok(())
}

async fn probe_head(input: String, prefix_bytes: usize) -> anyhow::Result<()> {
    let input = PathBuf::from(input);
    let file = fs::File::open(&input).await?;

    let mut prefix = Vec::new();
    file.take(prefix_bytes as u64).read_to_end(&mut prefix).await?;

    let info = match music_unboxing::extract(&file_name(&input), &prefix) {
        Err(DecryptError::UnsupportedFormat(_)) => music_unboxing::extract_plain(&prefix),
        other => other?,
    };

    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(())
}
