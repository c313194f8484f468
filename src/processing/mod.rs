pub mod pcm_mixer;
pub mod wav_format;
