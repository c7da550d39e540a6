//! Shared test fixtures: one complete, valid story.

use crate::story::models::{
    Chapter, CharacterProfile, PlotPoint, PlotType, Story, WorldBuilding,
};

const CHAPTER_TITLES: [&str; 5] = [
    "The Red Silence",
    "Footprints in the Dust",
    "The Storm Wall",
    "Shelter of Steel",
    "Bloom",
];

const CHAPTER_BODIES: [&str; 5] = [
    "Unit K-7 had swept the same crater for four hundred sols. Every morning the sun rose \
     pale over the rim, every evening the dust settled back where it had been. Then, between \
     two rust-coloured stones, K-7 saw something that did not belong: a single green leaf.",
    "K-7 logged the leaf, then logged it again. It rerouted its patrol, carried water from the \
     condenser one drop at a time, and built a ring of pebbles to keep the wind away. Ada, the \
     old survey drone, warned that nothing green had ever lasted on Mars.",
    "The storm arrived without warning, a brown wall a kilometre high. Ada screamed static \
     across the channel. K-7 planted itself over the flower, locked its joints, and let the \
     sand scour its paint away while its battery numbers fell one by one.",
    "When the storm passed, K-7 could barely move. Ada found it half buried and dragged it \
     into the sun to recharge. Beneath the robot's chassis, untouched and upright, the stem \
     had grown a small closed bud.",
    "On the next sol the bud opened. It was yellow, the colour of the old photographs of Earth \
     stored in K-7's memory. The robot no longer swept the crater. It sat beside the flower \
     each morning, and for the first time it was not alone.",
];

pub fn sample_story() -> Story {
    Story {
        title: "A Flower for K-7".to_string(),
        world: WorldBuilding {
            geography: "A wind-carved crater on the Martian plains, ringed by rust-red cliffs."
                .to_string(),
            atmosphere: "Silent, cold, and vast, with dust that glows at sunset.".to_string(),
            culture: "Abandoned maintenance robots keep old routines long after the colonists left."
                .to_string(),
        },
        characters: vec![
            CharacterProfile {
                name: "K-7".to_string(),
                description: "A small sweeper robot with one cracked optical sensor.".to_string(),
                traits: "Patient, curious, quietly stubborn.".to_string(),
                backstory: "Left behind when the colony evacuated, still following its route."
                    .to_string(),
            },
            CharacterProfile {
                name: "Ada".to_string(),
                description: "An old survey drone with a flickering antenna.".to_string(),
                traits: "Cautious, sardonic, secretly kind.".to_string(),
                backstory: "Once mapped the whole valley; now mostly maps her own regrets."
                    .to_string(),
            },
        ],
        plot_outline: PlotType::ORDER
            .iter()
            .enumerate()
            .map(|(i, plot_type)| PlotPoint {
                chapter_index: i as u32,
                plot_type: *plot_type,
                description: format!("{plot_type} of the flower story"),
            })
            .collect(),
        chapters: PlotType::ORDER
            .iter()
            .enumerate()
            .map(|(i, plot_type)| Chapter {
                title: CHAPTER_TITLES[i].to_string(),
                content: CHAPTER_BODIES[i].to_string(),
                image_prompt: format!("A small robot on Mars, scene {}", i + 1),
                plot_type: Some(*plot_type),
            })
            .collect(),
        ending: "Some friendships begin with a single leaf.".to_string(),
    }
}

pub fn sample_story_json() -> String {
    serde_json::to_string(&sample_story()).expect("sample story serializes")
}
