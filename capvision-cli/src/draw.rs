use capvision::CapMatch;
use opencv::{
    core::{Mat, Point, Rect, Scalar},
    imgproc::{self, FONT_HERSHEY_SIMPLEX, LINE_AA},
    prelude::*,
};

/// Draw every match on a copy of the image: green circles for confident
/// matches, red for uncertain ones, each labeled with identity and score.
pub fn annotate(
    img: &Mat,
    confident: &[CapMatch],
    uncertain: &[CapMatch],
) -> anyhow::Result<Mat> {
    let green = Scalar::new(50.0, 205.0, 50.0, 0.0);
    let red = Scalar::new(0.0, 0.0, 255.0, 0.0);

    let mut out = img.try_clone()?;
    for m in confident {
        draw_match(&mut out, m, green)?;
    }
    for m in uncertain {
        draw_match(&mut out, m, red)?;
    }

    Ok(out)
}

fn draw_match(img: &mut Mat, m: &CapMatch, circle_color: Scalar) -> anyhow::Result<()> {
    let yellow = Scalar::new(0.0, 255.0, 255.0, 0.0);
    let region = m.region;
    let center = Point::new(region.x + region.width / 2, region.y + region.height / 2);
    let label = format!(
        "{} {:.2}",
        m.identity.as_deref().unwrap_or("unknown").to_uppercase(),
        m.success
    );

    imgproc::circle(img, center, region.width / 2, circle_color, 4, LINE_AA, 0)?;
    imgproc::rectangle(
        img,
        Rect::new(region.x, center.y - 10, region.width + 25, 13),
        Scalar::all(0.0),
        imgproc::FILLED,
        imgproc::LINE_8,
        0,
    )?;
    imgproc::put_text(
        img,
        &label,
        Point::new(region.x, center.y),
        FONT_HERSHEY_SIMPLEX,
        0.33,
        yellow,
        1,
        LINE_AA,
        false,
    )?;

    Ok(())
}
