// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::sync::Arc;

use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};

use fractalview::config::{
    palette_from_args, parse_number, parse_size, validate_color, validate_complex, validate_pair,
    validate_range, DEFAULT_ANIMATION_PATH, DEFAULT_COLOR_MAX, DEFAULT_COLOR_ZERO, DEFAULT_SIZE,
};
use fractalview::palette::parse_color;
use fractalview::task::Progress;
use fractalview::workers::default_threads;
use fractalview::{
    animate, parse_complex, AnimationOutcome, BuddhabrotEngine, CancelToken, CartesianPlane,
    DataBox, Evaluator, FractalVariant, GifFileSink, GridRenderer, LogObserver, PixelSurface,
    Result,
};

const OUTPUT: &str = "output";
const SIZE: &str = "size";
const FRACTAL: &str = "fractal";
const ITERATIONS: &str = "iterations";
const POWER: &str = "power";
const CONSTANT: &str = "constant";
const UPLEFT: &str = "upleft";
const DOWNRIGHT: &str = "downright";
const END_POWER: &str = "end-power";
const END_CONSTANT: &str = "end-constant";
const END_UPLEFT: &str = "end-upleft";
const END_DOWNRIGHT: &str = "end-downright";
const FRAMES: &str = "frames";
const COLORS: &str = "colors";
const STOPS: &str = "stops";
const COLOR_SET: &str = "color-set";
const COLOR_ZERO: &str = "color-zero";
const COLOR_MAX: &str = "color-max";
const SUPERSAMPLING: &str = "supersampling";
const THREADS: &str = "threads";

fn output_arg<'a>() -> Arg<'a, 'a> {
    Arg::with_name(OUTPUT)
        .long(OUTPUT)
        .short("o")
        .takes_value(true)
        .help("Output file")
}

fn size_arg<'a>() -> Arg<'a, 'a> {
    Arg::with_name(SIZE)
        .long(SIZE)
        .short("s")
        .takes_value(true)
        .default_value(DEFAULT_SIZE)
        .validator(|s| validate_pair::<u32>(&s, 'x', "Could not parse output image size"))
        .help("Size of output image")
}

fn complex_arg<'a>(name: &'a str, default: &'a str, help: &'a str) -> Arg<'a, 'a> {
    Arg::with_name(name)
        .long(name)
        .takes_value(true)
        .allow_hyphen_values(true)
        .default_value(default)
        .validator(|s| validate_complex(&s))
        .help(help)
}

fn color_arg<'a>(name: &'a str, default: &'a str, help: &'a str) -> Arg<'a, 'a> {
    Arg::with_name(name)
        .long(name)
        .takes_value(true)
        .default_value(default)
        .validator(|s| validate_color(&s))
        .help(help)
}

fn iterations_arg<'a>() -> Arg<'a, 'a> {
    Arg::with_name(ITERATIONS)
        .long(ITERATIONS)
        .short("i")
        .takes_value(true)
        .default_value("100")
        .validator(|s| {
            validate_range(
                &s,
                1u32,
                1_000_000,
                "Could not parse iteration count",
                "Iteration count must be between 1 and 1000000",
            )
        })
        .help("Iterations before a point counts as inside the set")
}

fn threads_arg<'a>() -> Arg<'a, 'a> {
    Arg::with_name(THREADS)
        .long(THREADS)
        .short("t")
        .takes_value(true)
        .validator(|s| {
            validate_range(
                &s,
                1usize,
                1024,
                "Could not parse thread count",
                "Thread count must be between 1 and 1024",
            )
        })
        .help("Number of worker threads (defaults to one per core)")
}

fn fractal_arg<'a>() -> Arg<'a, 'a> {
    Arg::with_name(FRACTAL)
        .long(FRACTAL)
        .short("f")
        .takes_value(true)
        .default_value("Mandelbrot Simple")
        .validator(|s| s.parse::<FractalVariant>().map(|_| ()).map_err(|e| e.to_string()))
        .help("Fractal to draw, see the list subcommand")
}

fn palette_args<'a>() -> Vec<Arg<'a, 'a>> {
    vec![
        Arg::with_name(COLORS)
            .long(COLORS)
            .takes_value(true)
            .help("Comma-separated gradient colors, #rrggbb"),
        Arg::with_name(STOPS)
            .long(STOPS)
            .takes_value(true)
            .requires(COLORS)
            .help("Comma-separated gradient stops in [0, 1], one per color"),
        color_arg(COLOR_SET, DEFAULT_COLOR_ZERO, "Color of points inside the set"),
    ]
}

fn args<'a>() -> ArgMatches<'a> {
    App::new("fractalview")
        .version("0.1.0")
        .about("Escape-time fractal, Buddhabrot and animation renderer")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .subcommand(SubCommand::with_name("list").about("List the available fractals"))
        .subcommand(
            SubCommand::with_name("render")
                .about("Render one escape-time fractal")
                .arg(output_arg().required(true))
                .arg(size_arg())
                .arg(fractal_arg())
                .arg(iterations_arg())
                .arg(complex_arg(POWER, "(2, 0)", "Exponent of the recurrence"))
                .arg(complex_arg(CONSTANT, "(0.285, 0.013)", "Constant of the Julia variants"))
                .arg(complex_arg(UPLEFT, "(-2, 2)", "Upper left corner of the view"))
                .arg(complex_arg(DOWNRIGHT, "(2, -2)", "Lower right corner of the view"))
                .args(&palette_args())
                .arg(threads_arg()),
        )
        .subcommand(
            SubCommand::with_name("buddhabrot")
                .about("Render the density of escaping orbits")
                .arg(output_arg().required(true))
                .arg(size_arg())
                .arg(iterations_arg())
                .arg(complex_arg(POWER, "(2, 0)", "Exponent of the recurrence"))
                .arg(complex_arg(UPLEFT, "(-2, 2)", "Upper left corner of the view"))
                .arg(complex_arg(DOWNRIGHT, "(2, -2)", "Lower right corner of the view"))
                .arg(
                    Arg::with_name(SUPERSAMPLING)
                        .long(SUPERSAMPLING)
                        .takes_value(true)
                        .default_value("0")
                        .validator(|s| {
                            validate_range(
                                &s,
                                0u32,
                                16,
                                "Could not parse supersampling",
                                "Supersampling must be between 0 and 16",
                            )
                        })
                        .help("Extra samples per pixel side"),
                )
                .arg(color_arg(COLOR_ZERO, DEFAULT_COLOR_ZERO, "Color of unvisited pixels"))
                .arg(color_arg(COLOR_MAX, DEFAULT_COLOR_MAX, "Color of the most visited pixel"))
                .arg(threads_arg()),
        )
        .subcommand(
            SubCommand::with_name("animate")
                .about("Render an animated GIF between two views")
                .arg(output_arg().default_value(DEFAULT_ANIMATION_PATH))
                .arg(size_arg())
                .arg(fractal_arg())
                .arg(iterations_arg())
                .arg(
                    Arg::with_name(FRAMES)
                        .long(FRAMES)
                        .short("n")
                        .takes_value(true)
                        .default_value("10")
                        .validator(|s| {
                            validate_range(
                                &s,
                                2u32,
                                10_000,
                                "Could not parse frame count",
                                "Frame count must be between 2 and 10000",
                            )
                        })
                        .help("Number of frames"),
                )
                .arg(complex_arg(POWER, "(2, 0)", "Exponent of the first frame"))
                .arg(complex_arg(CONSTANT, "(0.285, 0.013)", "Constant of the first frame"))
                .arg(complex_arg(UPLEFT, "(-2, 2)", "Upper left corner of the first frame"))
                .arg(complex_arg(DOWNRIGHT, "(2, -2)", "Lower right corner of the first frame"))
                .arg(complex_arg(END_POWER, "(2, 0)", "Exponent of the last frame"))
                .arg(complex_arg(END_CONSTANT, "(0.285, 0.013)", "Constant of the last frame"))
                .arg(complex_arg(END_UPLEFT, "(-2, 2)", "Upper left corner of the last frame"))
                .arg(complex_arg(END_DOWNRIGHT, "(2, -2)", "Lower right corner of the last frame"))
                .args(&palette_args())
                .arg(threads_arg()),
        )
        .get_matches()
}

fn value<'a>(matches: &'a ArgMatches, name: &str) -> &'a str {
    matches.value_of(name).unwrap_or_default()
}

fn threads(matches: &ArgMatches) -> Result<usize> {
    match matches.value_of(THREADS) {
        Some(s) => parse_number(s),
        None => Ok(default_threads()),
    }
}

fn plane(matches: &ArgMatches, upleft: &str, downright: &str) -> Result<CartesianPlane> {
    let (width, height) = parse_size(value(matches, SIZE))?;
    CartesianPlane::new(
        f64::from(width),
        f64::from(height),
        parse_complex(value(matches, upleft))?,
        parse_complex(value(matches, downright))?,
    )
}

fn databox(matches: &ArgMatches, names: [&str; 4]) -> Result<DataBox> {
    let [power, constant, upleft, downright] = names;
    Ok(DataBox::new(
        parse_number(value(matches, ITERATIONS))?,
        parse_complex(value(matches, power))?,
        parse_complex(value(matches, constant))?,
        plane(matches, upleft, downright)?,
    ))
}

fn list() -> Result<()> {
    for name in FractalVariant::names() {
        println!("{}", name);
    }
    Ok(())
}

fn render(matches: &ArgMatches) -> Result<()> {
    let data = databox(matches, [POWER, CONSTANT, UPLEFT, DOWNRIGHT])?;
    let palette = palette_from_args(
        data.max_iterations,
        matches.value_of(COLORS),
        matches.value_of(STOPS),
        value(matches, COLOR_SET),
    )?;
    let variant: FractalVariant = value(matches, FRACTAL).parse()?;
    let evaluator = Evaluator::new(variant, &data, &palette);
    let surface = data.surface();
    let rows = Progress::new(data.plane.pixel_height());
    GridRenderer::new(&evaluator)
        .with_threads(threads(matches)?)
        .run(&data.plane, &surface, &CancelToken::new(), &rows, &LogObserver::new(variant.name()))?;
    surface.save(value(matches, OUTPUT))
}

fn buddhabrot(matches: &ArgMatches) -> Result<()> {
    let engine = BuddhabrotEngine::new(
        plane(matches, UPLEFT, DOWNRIGHT)?,
        parse_number(value(matches, ITERATIONS))?,
        parse_complex(value(matches, POWER))?,
        parse_number(value(matches, SUPERSAMPLING))?,
        parse_color(value(matches, COLOR_ZERO))?,
        parse_color(value(matches, COLOR_MAX))?,
    )
    .with_threads(threads(matches)?);
    let surface = PixelSurface::new(
        engine.plane().pixel_width(),
        engine.plane().pixel_height(),
    );
    let rows = Progress::new(engine.plane().pixel_height());
    engine.run(&surface, &CancelToken::new(), &rows, &LogObserver::new("buddhabrot"))?;
    surface.save(value(matches, OUTPUT))
}

fn animation(matches: &ArgMatches) -> Result<()> {
    let start = databox(matches, [POWER, CONSTANT, UPLEFT, DOWNRIGHT])?;
    let end = databox(matches, [END_POWER, END_CONSTANT, END_UPLEFT, END_DOWNRIGHT])?;
    let palette = palette_from_args(
        start.max_iterations,
        matches.value_of(COLORS),
        matches.value_of(STOPS),
        value(matches, COLOR_SET),
    )?;
    let handle = animate(
        value(matches, FRACTAL),
        parse_number(value(matches, FRAMES))?,
        start,
        end,
        &palette,
        Box::new(GifFileSink::new(value(matches, OUTPUT))),
        Arc::new(LogObserver::new("animation")),
    )?;
    match handle.wait()? {
        AnimationOutcome::EncodingFailed { reason, .. } => {
            eprintln!("Could not write the animation: {}", reason);
            std::process::exit(1);
        }
        _ => Ok(()),
    }
}

fn main() {
    env_logger::init();
    let matches = args();
    let result = match matches.subcommand() {
        ("list", Some(_)) => list(),
        ("render", Some(sub)) => render(sub),
        ("buddhabrot", Some(sub)) => buddhabrot(sub),
        ("animate", Some(sub)) => animation(sub),
        _ => Ok(()),
    };
    if let Err(e) = result {
        eprintln!("Render failure: {}", e);
        std::process::exit(1);
    }
}
