//! Синтетические входные данные для интеграционных тестов

#![allow(dead_code)]

use std::fs;
use std::path::Path;

use gdp_forecast::data::columns::*;
use gdp_forecast::{BoosterParams, Frame, PipelineConfig};
use ndarray::Array2;

pub fn national_frame() -> Frame {
    let years: Vec<i32> = (1980..=2024).collect();
    let columns = vec![
        GDP_GROWTH,
        INFLATION,
        INTEREST_RATE,
        EXCHANGE_RATE,
        FISCAL_DEFICIT,
        UNEMPLOYMENT,
        M3_GROWTH,
        BANK_CREDIT,
        EXPORTS,
        IMPORTS,
        FDI,
        FIXED_CAPITAL,
    ];
    let values = Array2::from_shape_fn((years.len(), columns.len()), |(i, j)| {
        let t = i as f64;
        match j {
            0 => 6.0 + 1.5 * (t * 0.6).sin() + 0.3 * (t * 1.7).cos(),
            1 => 6.0 + 2.0 * (t * 0.4 + 1.0).sin(),
            2 => 7.0 + (t * 0.3).cos(),
            3 => 10.0 + 1.6 * t,
            4 => 5.0 + 0.8 * (t * 0.5).sin(),
            5 => 6.0 + 0.5 * (t * 0.45).cos(),
            6 => 14.0 + 2.0 * (t * 0.35).sin(),
            7 => 13.0 + 3.0 * (t * 0.55).cos(),
            8 => 10.0 + 0.2 * t * t,
            9 => 12.0 + 0.25 * t * t,
            10 => 0.1 + 0.04 * t * t,
            _ => 25.0 + 0.2 * t + (t * 0.8).sin(),
        }
    });
    Frame::new(years, columns.into_iter().map(String::from).collect(), values).unwrap()
}

pub fn write_it_sector(path: &Path) {
    let mut text = String::from(
        "State,Year,State_IT_Revenue(Cr),Repo_Rate(%),Global_Economic_Index,\
         Urban_Unemployment_Rate(%),Internet_Penetration(%)\n",
    );
    for year in 2010..=2020 {
        let t = (year - 2010) as f64;
        let repo = 6.0 + (t * 0.7).sin() * 0.5;
        let index = 100.0 + t + (t * 1.3).cos();
        let karnataka = 1000.0 * 1.15f64.powf(t) + (t * 1.7).sin() * 20.0;
        let kerala = 500.0 + 5.0 * t + (t * 0.9).cos() * 8.0;
        for (state, revenue, unemployment, internet) in [
            ("Karnataka", karnataka, 5.0 + t * 0.1, 30.0 + t * 4.0),
            ("Kerala", kerala, 4.5 + t * 0.1, 40.0 + t * 3.0),
        ] {
            text.push_str(&format!(
                "{},{},{},{},{},{},{}\n",
                state, year, revenue, repo, index, unemployment, internet
            ));
        }
    }
    fs::write(path, text).unwrap();
}

/// Производство культур и климат по двум штатам за 2000-2011
pub fn write_agriculture(production: &Path, climate: &Path) {
    let mut crops =
        String::from("State,Year,Crop,Production Quantity,Export Volume,Wholesale Price\n");
    let mut soil = String::from(
        "State,Year,Annual Rainfall (mm),Soil pH Level,Organic Matter (%),Soil Type\n",
    );
    for year in 2000..=2011 {
        let t = (year - 2000) as f64;
        for (state, crop, base, slope, price) in [
            ("Punjab", "Wheat", 1000.0, 40.0, 20.0),
            ("Punjab", "Rice", 800.0, 10.0, 18.0),
            ("Tamil Nadu", "Rice", 500.0, 5.0, 15.0),
        ] {
            let quantity = base + slope * t + (t * 1.3).sin() * 15.0;
            let export = quantity * 0.2 + (t * 0.7).cos() * 5.0;
            crops.push_str(&format!(
                "{},{},{},{},{},{}\n",
                state,
                year,
                crop,
                quantity,
                export,
                price + (t * 0.5).cos()
            ));
        }
        let rainfall = 900.0 + ((year * 37) % 11) as f64 * 10.0;
        soil.push_str(&format!("Punjab,{},{},6.5,2.5,Alluvial\n", year, rainfall));
        soil.push_str(&format!("Tamil Nadu,{},{},5.8,1.5,Red\n", year, rainfall + 200.0));
    }
    fs::write(production, crops).unwrap();
    fs::write(climate, soil).unwrap();
}

/// Конфигурация во временном каталоге с уменьшенным числом раундов бустинга
pub fn config_in(root: &Path, with_it_sector: bool) -> PipelineConfig {
    let mut config = PipelineConfig::rooted_at(root);
    config.booster = BoosterParams {
        num_boost_round: 80,
        ..Default::default()
    };
    fs::create_dir_all(&config.raw_dir).unwrap();
    national_frame().to_csv(config.national_path()).unwrap();
    if with_it_sector {
        write_it_sector(&config.it_path());
    }
    config
}
