use ads1256_scan::mock::{Frame, MockTransport, NoDelay};
use ads1256_scan::{
    Ads1256, Channel, ChannelPair, Config, DataRate, Gain, Mode, Register, REG_ADCON, REG_DRATE,
    REG_MUX, REG_STATUS,
};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn configure_and_convert() {
    init_logger();
    let mock = MockTransport::new();
    let adc = Ads1256::with_delay(mock.clone(), NoDelay);
    let config = Config::default()
        .with_data_rate(DataRate::Sps100)
        .with_gain(Gain::Gain8)
        .with_buffer(true);

    adc.init_transport().unwrap();
    adc.initialize(&config).unwrap();

    assert_eq!(mock.register(REG_STATUS), config.status_byte());
    assert_eq!(mock.register(REG_ADCON), config.adcon_byte());
    assert_eq!(mock.register(REG_DRATE), DataRate::Sps100.code());
    assert_eq!(adc.last_read_register(Register::Drate), DataRate::Sps100.code());

    let pair = ChannelPair::new(Channel::Ain3, Channel::AinCom);
    adc.set_channel_pair(pair).unwrap();
    assert_eq!(mock.register(REG_MUX), 0x38);
    assert_eq!(adc.single_conversion().unwrap(), 0x38);
    assert_eq!(adc.mode(), Mode::Idle);

    mock.clear_frames();
    adc.close().unwrap();
    let frames = mock.frames();
    assert!(frames.contains(&Frame::PowerDown));
    assert_eq!(frames.last(), Some(&Frame::Close));
}

#[test]
fn close_reports_every_failure() {
    init_logger();
    let mock = MockTransport::new();
    let adc = Ads1256::with_delay(mock.clone(), NoDelay);
    mock.fail_all(true);

    let err = adc.close().unwrap_err();
    // reset, standby, power down and close each fail once
    assert_eq!(err.flatten().len(), 4);
    assert_eq!(mock.frames().last(), Some(&Frame::Close));
}
