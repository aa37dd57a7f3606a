use clap::{Arg, ArgAction, Command};
use log::{info, warn};
use potential_flow::analysis::PolarAnalyzer;
use potential_flow::config::RunConfig;
use potential_flow::presets::rankine_contour;
use potential_flow::sampler::{streamlines, StreamlineOptions};
use potential_flow::visualizer::Visualizer;
use potential_flow::{
    BodyShape, Domain, FieldSampler, FlowError, FlowResult, PanelGeometry, PanelMethod, Preset,
    SamplingGrid, ScalarKind, Session,
};
use std::path::Path;
use std::time::Instant;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let matches = Command::new("Potential Flow")
        .version("0.1.0")
        .about("2D potential flow: singularity superposition and source/vortex panel methods")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("JSON run configuration; command-line flags override it"),
        )
        .arg(
            Arg::new("mode")
                .short('m')
                .long("mode")
                .value_name("MODE")
                .help("What to run")
                .value_parser(["field", "panel", "sweep"])
                .default_value("field"),
        )
        .arg(
            Arg::new("method")
                .long("method")
                .value_name("METHOD")
                .help("Panel method: source (spm), vortex (vpm) or combined (spvp)"),
        )
        .arg(
            Arg::new("panels")
                .short('n')
                .long("panels")
                .value_name("COUNT")
                .help("Number of panels on the body")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("alpha")
                .short('a')
                .long("alpha")
                .value_name("DEGREES")
                .help("Angle of attack in degrees")
                .allow_negative_numbers(true)
                .value_parser(clap::value_parser!(f64)),
        )
        .arg(
            Arg::new("speed")
                .long("speed")
                .value_name("V_INF")
                .help("Freestream speed")
                .value_parser(clap::value_parser!(f64)),
        )
        .arg(
            Arg::new("body")
                .short('b')
                .long("body")
                .value_name("BODY")
                .help("Panel body: cylinder or a NACA 4-digit code such as naca2412"),
        )
        .arg(
            Arg::new("preset")
                .short('p')
                .long("preset")
                .value_name("PRESET")
                .help("Element preset for field mode")
                .value_parser(["cylinder", "rotating_cylinder", "rankine_oval"]),
        )
        .arg(
            Arg::new("xsteps")
                .short('x')
                .long("xsteps")
                .value_name("STEPS")
                .help("Grid points along x")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("OUTPUT_DIR")
                .help("Output directory for images and JSON"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Debug logging")
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    let level = if matches.get_flag("verbose") { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let mut config = match matches.get_one::<String>("config") {
        Some(path) => RunConfig::load(path)?,
        None => RunConfig::default(),
    };
    if let Some(method) = matches.get_one::<String>("method") {
        config.panel.method = method.parse()?;
    }
    if let Some(&panels) = matches.get_one::<usize>("panels") {
        config.panel.panels = panels;
    }
    if let Some(&alpha) = matches.get_one::<f64>("alpha") {
        config.freestream.alpha_deg = alpha;
    }
    if let Some(&speed) = matches.get_one::<f64>("speed") {
        config.freestream.speed = speed;
    }
    if let Some(body) = matches.get_one::<String>("body") {
        config.panel.body = parse_body(body)?;
    }
    if let Some(preset) = matches.get_one::<String>("preset") {
        config.preset = Some(parse_preset(preset, config.freestream.speed)?);
    }
    if let Some(&xsteps) = matches.get_one::<usize>("xsteps") {
        config.grid.xsteps = xsteps;
    }
    if let Some(output) = matches.get_one::<String>("output") {
        config.output.dir = output.clone();
    }
    config.validate()?;

    let output_dir = config.output.dir.clone();
    std::fs::create_dir_all(&output_dir)?;
    let mode = matches
        .get_one::<String>("mode")
        .map(String::as_str)
        .unwrap_or("field");

    println!("🌊 Potential Flow");
    println!("Mode: {}", mode);
    println!("Output: {}", output_dir);

    let start_time = Instant::now();
    match mode {
        "panel" => run_panel(&config, &output_dir)?,
        "sweep" => run_sweep(&config, &output_dir)?,
        _ => run_field(&config, &output_dir)?,
    }
    println!("🎉 Done in {:.2} s", start_time.elapsed().as_secs_f64());
    Ok(())
}

fn parse_body(text: &str) -> FlowResult<BodyShape> {
    let lower = text.to_ascii_lowercase();
    if lower == "cylinder" || lower == "circle" {
        return Ok(BodyShape::default());
    }
    let code = lower.strip_prefix("naca").unwrap_or(&lower);
    if code.len() == 4 && code.chars().all(|c| c.is_ascii_digit()) {
        Ok(BodyShape::Naca4 {
            code: code.to_string(),
        })
    } else {
        Err(FlowError::invalid("body", format!("unknown body `{text}`")))
    }
}

fn parse_preset(name: &str, speed: f64) -> FlowResult<Preset> {
    match name {
        "cylinder" => Ok(Preset::cylinder(speed, 1.0)),
        // stagnation points move to -30 and -150 degrees
        "rotating_cylinder" => Ok(Preset::rotating_cylinder(
            speed,
            1.0,
            2.0 * std::f64::consts::PI * speed,
        )),
        "rankine_oval" => Ok(Preset::rankine_oval(speed, 1.0, 1.0)),
        other => Err(FlowError::invalid("preset", format!("unknown preset `{other}`"))),
    }
}

fn run_field(config: &RunConfig, output_dir: &str) -> Result<(), Box<dyn std::error::Error>> {
    let mut session = Session::new(config.grid.domain()?, config.grid.xsteps)?;
    session.set_options(config.field_options());
    for element in &config.elements {
        session.add_element(element.clone())?;
    }
    match config.preset {
        Some(ref preset) => {
            session.apply_preset(preset)?;
        }
        None if config.elements.is_empty() => {
            warn!("no elements configured, falling back to the cylinder preset");
            session.apply_preset(&Preset::cylinder(config.freestream.speed, 0.5))?;
        }
        None => {}
    }

    println!("✅ Flow field initialized");
    println!("Grid size: {}x{}", session.grid().nx(), session.grid().ny());
    for label in session.field().labels() {
        println!("  {}", label);
    }

    let visualizer = Visualizer::new(config.output.width, config.output.height);
    let mut artifacts = Vec::with_capacity(ScalarKind::ALL.len());
    for kind in ScalarKind::ALL {
        let artifact = session.draw(kind)?.clone();
        if let Some((lo, hi)) = artifact.color_range {
            println!(
                "  {:<22} [{:>9.4}, {:>9.4}] {}",
                kind.long_name(),
                lo,
                hi,
                kind.units()
            );
        }
        artifacts.push(artifact);
    }

    let lines = streamlines(session.field(), session.grid(), &StreamlineOptions::default());
    let elements = session.field().elements();
    for artifact in &artifacts {
        let overlay: &[Vec<(f64, f64)>] = if artifact.kind == ScalarKind::VelocityMagnitude {
            &lines
        } else {
            &[]
        };
        visualizer.save_field(
            artifact,
            elements,
            overlay,
            format!("{}/{}.png", output_dir, artifact.kind),
        )?;
    }
    visualizer.save_overview(&artifacts, elements, format!("{}/overview.png", output_dir))?;

    if let Some(preset) = config.preset {
        if let Preset::RankineOval {
            speed,
            strength,
            separation,
        } = preset
        {
            let contour = rankine_contour(
                speed,
                strength,
                separation,
                &Default::default(),
            )?;
            println!(
                "🥚 Rankine oval: half-length {:.5}, half-thickness {:.5} ({} Newton iterations)",
                contour.half_length, contour.half_thickness, contour.iterations
            );
        }
        let lift = preset.lift(config.freestream.density);
        if lift != 0.0 {
            println!("   Kutta-Joukowski lift: {:.4} N/m", lift);
        }
    }
    Ok(())
}

/// Bounding box of the body padded by one body length on every side
fn panel_domain(geometry: &PanelGeometry) -> FlowResult<Domain> {
    let fold = |v: &[f64]| {
        v.iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &x| (lo.min(x), hi.max(x)))
    };
    let (x_lo, x_hi) = fold(&geometry.xb);
    let (y_lo, y_hi) = fold(&geometry.yb);
    let pad = (x_hi - x_lo).max(y_hi - y_lo);
    Domain::new(x_lo - pad, x_hi + pad, y_lo - pad, y_hi + pad)
}

fn run_panel(config: &RunConfig, output_dir: &str) -> Result<(), Box<dyn std::error::Error>> {
    let mut session = Session::new(config.grid.domain()?, config.grid.xsteps)?;
    session.set_body(config.panel.body.clone());
    session.set_panels(config.panel.panels);
    session.set_method(config.panel.method);
    session.set_freestream(config.freestream.freestream())?;

    let (geometry, solution) = session.solved()?;
    let (geometry, solution) = (geometry.clone(), solution.clone());

    println!("✅ Panel solve complete");
    println!("Body: {}", config.panel.body.label());
    println!("Panels: {}", geometry.len());
    println!("Method: {}", solution.method());
    println!("   CL (pressure): {:.4}", solution.cl());
    println!("   CD (pressure): {:.4}", solution.cd());
    if solution.method() != PanelMethod::Source {
        println!("   Circulation:   {:.5}", solution.circulation());
        println!("   CL (K-J):      {:.4}", solution.cl_kutta_joukowski());
        println!("   Lift:          {:.4} N/m", solution.lift());
    }

    let json = serde_json::to_string_pretty(&solution)?;
    std::fs::write(Path::new(output_dir).join("panel_solution.json"), json)?;

    let visualizer = Visualizer::new(config.output.width, config.output.height);
    visualizer.save_panel_geometry(&geometry, format!("{}/panel_geometry.png", output_dir))?;
    visualizer.save_surface_cp(&geometry, &solution, format!("{}/surface_cp.png", output_dir))?;

    let domain = panel_domain(&geometry)?;
    let grid = SamplingGrid::new(domain, config.grid.xsteps.min(200))?;
    let field = session.panel_field(&grid)?;
    let strengths = solution.strengths();
    let sampler = FieldSampler::new(&geometry, &strengths, config.freestream.freestream())?;
    let lines = streamlines(&sampler, &grid, &StreamlineOptions::default());
    info!("traced {} streamlines", lines.len());
    visualizer.save_panel_field(
        &field,
        domain,
        &geometry,
        &lines,
        format!("{}/panel_field.png", output_dir),
    )?;
    Ok(())
}

fn run_sweep(config: &RunConfig, output_dir: &str) -> Result<(), Box<dyn std::error::Error>> {
    println!("🔄 Running angle-of-attack sweep...");
    let geometry = config.panel.body.discretize(config.panel.panels)?;
    let angles = config.sweep.angles()?;
    let mut analyzer = PolarAnalyzer::new(config.panel.method);
    analyzer.sweep(&geometry, &config.freestream.freestream(), &angles)?;
    analyzer.save_metrics(format!("{}/polar.json", output_dir))?;
    analyzer.print_summary();
    Ok(())
}
