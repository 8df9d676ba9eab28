/// R plots of the histogram projections
///
/// For each projection an R script is written that draws the background
/// overlaps as translucent bars and the ping-pong overlap as a red line,
/// then renders it to PNG. The scripts are run with `Rscript`; when R is not
/// available the scripts are kept and a warning is logged.
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use log::{info, warn};

use crate::error::Error;
use crate::histogram::{JointOverlapHistogram, Projection, project};

use super::overlap_column;

/// Values per line in the generated data frame.
const VALUES_PER_LINE: usize = 10;

/// Render the R script plotting one projection of `histogram`.
pub fn render_script(
    histogram: &JointOverlapHistogram,
    projection: Projection,
    ping_pong_overlap: i32,
) -> String {
    let rows = project(histogram, projection);
    let bars = rows.first().map_or(0, Vec::len);
    let stem = projection.file_stem();
    let overlaps: Vec<i32> = histogram.overlaps().collect();

    let mut script = String::new();
    script.push_str("histograms <- data.frame(");
    for (i, (overlap, row)) in overlaps.iter().zip(&rows).enumerate() {
        if i > 0 {
            script.push(',');
        }
        let _ = write!(script, "\n{}=c(", overlap_column(*overlap));
        for (bar, value) in row.iter().enumerate() {
            if bar % VALUES_PER_LINE == 0 {
                script.push('\n');
            }
            let _ = write!(script, "{value}");
            if bar + 1 < row.len() {
                script.push_str(", ");
            }
        }
        script.push(')');
    }
    script.push_str("\n)\n");

    script.push_str("options(bitmapType='cairo')\n");
    let _ = writeln!(script, "png('{stem}.png')");

    let ylab = if projection.log_scale() {
        script.push_str("histograms <- log10(histograms)\n");
        script.push_str("histograms[!is.finite(as.matrix(histograms))] <- 0\n");
        "log10(frequency)"
    } else {
        "frequency"
    };
    let _ = writeln!(
        script,
        "plot(0, 0, xlim=c(0,{bars}), ylim=c(0,max(histograms,0)), type='n', xlab='{}', ylab='{ylab}', xaxt='n')",
        projection.title()
    );

    match projection.labels() {
        Some(labels) => {
            let _ = writeln!(
                script,
                "axis(1, at=0:{}+0.5, labels=c('{}'))",
                labels.len() - 1,
                labels.join("', '")
            );
        }
        None => {
            let _ = writeln!(
                script,
                "axis(1, at=quantile(c(0,{bars}), probs=seq(0, 1, 0.2))+0.5, labels=quantile(c(0,{bars}), probs=seq(0, 1, 0.2)))"
            );
        }
    }

    let ping_pong = overlap_column(ping_pong_overlap);
    let background: Vec<String> = overlaps
        .iter()
        .filter(|&&overlap| overlap != ping_pong_overlap)
        .map(|&overlap| format!("'{}'", overlap_column(overlap)))
        .collect();
    let _ = writeln!(script, "for (column in c({}))", background.join(", "));
    script.push_str(
        "\tbarplot(histograms[,column], col=rgb(0,0,0,alpha=0.1), border=NA, axes=FALSE, add=TRUE, width=1, space=0)\n",
    );
    let _ = writeln!(script, "for (bin in 1:{bars})");
    let _ = writeln!(
        script,
        "\tlines(c(bin-1, bin), c(histograms[bin, '{ping_pong}'], histograms[bin, '{ping_pong}']), type='l', col='red', lwd=2)"
    );
    let _ = writeln!(
        script,
        "legend(x='top', c('{ping_pong_overlap} nt overlap', 'other overlaps'), col=c('red', 'black'), ncol=2, lwd=c(3,3), xpd=TRUE, inset=-0.1)"
    );
    script.push_str("garbage <- dev.off()\n");
    script
}

/// Write the R script of one projection into `dir`.
pub fn write_script(
    dir: &Path,
    histogram: &JointOverlapHistogram,
    projection: Projection,
    ping_pong_overlap: i32,
) -> Result<PathBuf, Error> {
    let path = dir.join(format!("{}.R", projection.file_stem()));
    fs::write(&path, render_script(histogram, projection, ping_pong_overlap))
        .map_err(|e| Error::io(e, &path))?;
    Ok(path)
}

/// Write and run the R scripts of all projections; returns the script paths.
///
/// Failing to run `Rscript` is not an error: the scripts stay on disk.
pub fn plot_histograms(
    dir: &Path,
    histogram: &JointOverlapHistogram,
    ping_pong_overlap: i32,
) -> Result<Vec<PathBuf>, Error> {
    let scripts = Projection::ALL
        .into_iter()
        .map(|projection| write_script(dir, histogram, projection, ping_pong_overlap))
        .collect::<Result<Vec<_>, _>>()?;

    for (projection, script) in Projection::ALL.into_iter().zip(&scripts) {
        let Some(file_name) = script.file_name() else {
            continue;
        };
        match Command::new("Rscript").arg(file_name).current_dir(dir).status() {
            Ok(status) if status.success() => info!("Plotted {}", projection.title()),
            Ok(status) => warn!("Rscript {} exited with {status}", script.display()),
            Err(e) => {
                warn!(
                    "Could not run Rscript ({e}); R scripts are kept in {}",
                    dir.display()
                );
                break;
            }
        }
    }
    Ok(scripts)
}
